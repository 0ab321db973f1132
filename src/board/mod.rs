/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Classification of moves and parsing of UCI move strings.
mod moves;

/// Validation, terminal detection, and identity of positions.
mod position;

pub use moves::*;
pub use position::*;
