/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::cmp::Reverse;

use chessie::{Game, Move};

use crate::{
    board::{legal_moves, MoveClass},
    value_of,
};

/// Scores a move by [MVV-LVA](https://www.chessprogramming.org/MVV-LVA): the value of the
/// captured piece minus the value of the capturing piece.
///
/// Returns `None` for moves that do not capture. En passant is a Pawn taking a Pawn.
#[inline(always)]
pub fn mvv_lva(class: MoveClass) -> Option<i32> {
    Some(value_of(class.victim()?) - value_of(class.attacker()?))
}

/// Sorts `moves` so that every capture comes before every non-capture,
/// with captures in descending MVV-LVA order.
///
/// The sort is stable, so moves of equal rank keep their generated order.
pub fn order_moves(game: &Game, moves: &mut [Move]) {
    moves.sort_by_cached_key(|&mv| match mvv_lva(MoveClass::new(game, mv)) {
        Some(score) => (false, Reverse(score)),
        None => (true, Reverse(0)),
    });
}

/// Returns the legal captures in `game`, ordered by MVV-LVA.
pub fn captures(game: &Game) -> Vec<Move> {
    let mut captures = legal_moves(game)
        .into_iter()
        .filter(|mv| mv.is_capture())
        .collect::<Vec<_>>();

    order_moves(game, &mut captures);

    captures
}
