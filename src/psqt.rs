/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use chessie::{Color, Piece, PieceKind, Square};

use crate::board::BOARD_WIDTH;

/*
 * Tables are written as they appear on a board seen from White's side: the first row is the
 * eighth rank and the last row is the first rank. Material is not included.
 */

#[rustfmt::skip]
const PAWN: Psqt = Psqt::new([
      0,   0,   0,   0,   0,   0,   0,   0,
     50,  50,  50,  50,  50,  50,  50,  50,
     10,  10,  20,  30,  30,  20,  10,  10,
      5,   5,  10,  25,  25,  10,   5,   5,
      0,   0,   0,  20,  20,   0,   0,   0,
      5,  -5, -10,   0,   0, -10,  -5,   5,
      5,  10,  10, -20, -20,  10,  10,   5,
      0,   0,   0,   0,   0,   0,   0,   0,
]);

#[rustfmt::skip]
const KNIGHT: Psqt = Psqt::new([
    -50, -40, -30, -30, -30, -30, -40, -50,
    -40, -20,   0,   0,   0,   0, -20, -40,
    -30,   0,  10,  15,  15,  10,   0, -30,
    -30,   5,  15,  20,  20,  15,   5, -30,
    -30,   0,  15,  20,  20,  15,   0, -30,
    -30,   5,  10,  15,  15,  10,   5, -30,
    -40, -20,   0,   5,   5,   0, -20, -40,
    -50, -40, -30, -30, -30, -30, -40, -50,
]);

#[rustfmt::skip]
const BISHOP: Psqt = Psqt::new([
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -10,   0,   5,  10,  10,   5,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,  10,  10,  10,  10,   0, -10,
    -10,  10,  10,  10,  10,  10,  10, -10,
    -10,   5,   0,   0,   0,   0,   5, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
]);

#[rustfmt::skip]
const ROOK: Psqt = Psqt::new([
      0,   0,   0,   0,   0,   0,   0,   0,
      5,  10,  10,  10,  10,  10,  10,   5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
      0,   0,   0,   5,   5,   0,   0,   0,
]);

#[rustfmt::skip]
const QUEEN: Psqt = Psqt::new([
    -20, -10, -10,  -5,  -5, -10, -10, -20,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -10,   0,   5,   5,   5,   5,   0, -10,
     -5,   0,   5,   5,   5,   5,   0,  -5,
      0,   0,   5,   5,   5,   5,   0,  -5,
    -10,   5,   5,   5,   5,   5,   0, -10,
    -10,   0,   5,   0,   0,   0,   0, -10,
    -20, -10, -10,  -5,  -5, -10, -10, -20,
]);

#[rustfmt::skip]
const KING_MG: Psqt = Psqt::new([
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -20, -30, -30, -40, -40, -30, -30, -20,
    -10, -20, -20, -20, -20, -20, -20, -10,
     20,  20,   0,   0,   0,   0,  20,  20,
     20,  30,  10,   0,   0,  10,  30,  20,
]);

#[rustfmt::skip]
const KING_EG: Psqt = Psqt::new([
    -50, -40, -30, -20, -20, -30, -40, -50,
    -30, -20, -10,   0,   0, -10, -20, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -30,   0,   0,   0,   0, -30, -30,
    -50, -30, -30, -30, -30, -30, -30, -50,
]);

/// A [Piece-Square Table](https://www.chessprogramming.org/Piece-Square_Tables) for use in evaluation.
///
/// Stored from White's perspective, indexed by square (A1 = 0).
/// Black reads the table through the point-reflected square (`63 - index`).
#[derive(Debug)]
pub struct Psqt([i32; Square::COUNT]);

impl Psqt {
    /// Fetch the placement bonus for `piece` on the square at `index`, relative to its own color.
    ///
    /// The King's table depends on whether the game is in the endgame.
    #[inline(always)]
    pub fn eval(piece: Piece, index: usize, endgame: bool) -> i32 {
        Self::table_for(piece.kind(), endgame).get_relative(index, piece.color())
    }

    /// Fetch the table used for the provided [`PieceKind`].
    #[inline(always)]
    pub fn table_for(kind: PieceKind, endgame: bool) -> &'static Self {
        match kind {
            PieceKind::Pawn => &PAWN,
            PieceKind::Knight => &KNIGHT,
            PieceKind::Bishop => &BISHOP,
            PieceKind::Rook => &ROOK,
            PieceKind::Queen => &QUEEN,
            PieceKind::King if endgame => &KING_EG,
            PieceKind::King => &KING_MG,
        }
    }

    /// Creates a new [`Psqt`] from a table written eighth-rank first.
    const fn new(table: [i32; Square::COUNT]) -> Self {
        let mut flipped = table;

        let mut i = 0;
        while i < table.len() {
            flipped[i] = table[Square::COUNT - 1 - i];
            i += 1;
        }

        Self(flipped)
    }

    /// Get the value of this table at the provided square index, from White's perspective.
    #[inline(always)]
    pub const fn get(&self, index: usize) -> i32 {
        self.0[index]
    }

    /// Get the value of this table at the provided square index, relative to `color`.
    #[inline(always)]
    pub const fn get_relative(&self, index: usize, color: Color) -> i32 {
        match color {
            Color::White => self.get(index),
            Color::Black => self.get(Square::COUNT - 1 - index),
        }
    }
}

impl fmt::Display for Psqt {
    /// Printing a [`Psqt`] will display it in the same way it is written in the code (White's perspective).
    ///
    /// If the alternate formatter is used (`#`), it will print as if from Black's perspective.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = if f.alternate() {
            Color::Black
        } else {
            Color::White
        };

        for rank in (0..BOARD_WIDTH).rev() {
            write!(f, "{}| ", rank + 1)?;
            for file in 0..BOARD_WIDTH {
                let value = self.get_relative(rank * BOARD_WIDTH + file, color);
                write!(f, "{value:3} ")?;
            }
            writeln!(f)?;
        }

        write!(f, " +")?;
        for _ in 0..BOARD_WIDTH {
            write!(f, "----")?;
        }
        write!(f, "\n    ")?;
        for file in 'a'..='h' {
            write!(f, "{file}   ")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_is_correct_for_colors() {
        let kinds = [
            PieceKind::Pawn,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ];

        for endgame in [false, true] {
            for index in 0..Square::COUNT {
                for kind in kinds {
                    let white = Psqt::eval(Piece::new(Color::White, kind), index, endgame);
                    let black = Psqt::eval(
                        Piece::new(Color::Black, kind),
                        Square::COUNT - 1 - index,
                        endgame,
                    );

                    assert_eq!(
                        white, black,
                        "{kind:?} on {index} (endgame := {endgame}): {white} (white) != {black} (black)"
                    );
                }
            }
        }
    }

    #[test]
    fn test_table_orientation() {
        // Knights on the rim are dim, from both sides
        assert_eq!(KNIGHT.get_relative(0, Color::White), -50);
        assert_eq!(KNIGHT.get_relative(63, Color::Black), -50);

        // Pawns on the seventh rank are close to promoting
        assert_eq!(PAWN.get_relative(8 * 6 + 3, Color::White), 50);
        assert_eq!(PAWN.get_relative(8 + 3, Color::Black), 50);

        // A castled King is safe in the middlegame, and wants the center in the endgame
        assert_eq!(KING_MG.get_relative(6, Color::White), 30);
        assert_eq!(KING_EG.get_relative(6, Color::White), -30);
    }
}
