/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Divisor for computing the soft timeout of a search.
macro_rules! soft_timeout_divisor {
    () => {
        20
    };
}
pub(crate) use soft_timeout_divisor;

/// Divisor for computing the hard timeout of a search.
macro_rules! hard_timeout_divisor {
    () => {
        5
    };
}
pub(crate) use hard_timeout_divisor;

/// Divisor for computing how much of the time increment to use.
macro_rules! time_inc_divisor {
    () => {
        2
    };
}
pub(crate) use time_inc_divisor;

/// Penalty for every pawn standing on a file shared with a friendly pawn.
macro_rules! doubled_pawn_penalty {
    () => {
        10
    };
}
pub(crate) use doubled_pawn_penalty;

/// Penalty for a pawn with no friendly pawn on either adjacent file.
macro_rules! isolated_pawn_penalty {
    () => {
        20
    };
}
pub(crate) use isolated_pawn_penalty;

/// Flat bonus for a passed pawn, before advancement.
macro_rules! passed_pawn_base {
    () => {
        10
    };
}
pub(crate) use passed_pawn_base;

/// Bonus per rank a passed pawn has advanced.
macro_rules! passed_pawn_per_rank {
    () => {
        10
    };
}
pub(crate) use passed_pawn_per_rank;

/// Bonus per friendly pawn in the three squares in front of the King.
macro_rules! pawn_shield_bonus {
    () => {
        10
    };
}
pub(crate) use pawn_shield_bonus;

/// Bonus for a minor or major piece standing in the central 4x4 region.
macro_rules! center_mobility_bonus {
    () => {
        5
    };
}
pub(crate) use center_mobility_bonus;

/// Bonus for holding two or more bishops.
macro_rules! bishop_pair_bonus {
    () => {
        30
    };
}
pub(crate) use bishop_pair_bonus;
