/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use anyhow::{bail, Context, Result};
use chessie::{Game, Move, PieceKind};

use super::legal_moves;

/// Describes what a move does to the board.
///
/// A [`Move`] carries its own flags, but not the kinds of the pieces involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveClass {
    /// A non-capturing, non-special move.
    Quiet,

    Castle,

    /// A capture of a piece standing on the destination square.
    Capture {
        /// Kind of the moving piece.
        attacker: PieceKind,

        /// Kind of the captured piece.
        victim: PieceKind,
    },

    /// A Pawn capturing en passant. The victim is always a Pawn.
    EnPassant,

    /// A Pawn reaching the last rank.
    Promotion {
        /// Kind of piece the Pawn becomes.
        promote_to: PieceKind,

        /// Kind of the captured piece, if the promotion was also a capture.
        victim: Option<PieceKind>,
    },
}

impl MoveClass {
    /// Classifies `mv`, which must be a legal move in `game`.
    pub fn new(game: &Game, mv: Move) -> Self {
        let victim = || {
            mv.is_capture()
                .then(|| game.piece_at(mv.to()))
                .flatten()
                .map(|piece| piece.kind())
        };

        if mv.is_castle() {
            Self::Castle
        } else if mv.is_en_passant() {
            Self::EnPassant
        } else if let Some(promote_to) = mv.promotion() {
            Self::Promotion {
                promote_to,
                victim: victim(),
            }
        } else {
            match (game.piece_at(mv.from()), victim()) {
                (Some(attacker), Some(victim)) => Self::Capture {
                    attacker: attacker.kind(),
                    victim,
                },
                _ => Self::Quiet,
            }
        }
    }

    /// Returns `true` if this move removes an enemy piece from the board.
    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        self.victim().is_some()
    }

    /// Returns the kind of piece captured by this move, if any.
    #[inline(always)]
    pub const fn victim(&self) -> Option<PieceKind> {
        match *self {
            Self::Capture { victim, .. } => Some(victim),
            Self::EnPassant => Some(PieceKind::Pawn),
            Self::Promotion { victim, .. } => victim,
            Self::Quiet | Self::Castle => None,
        }
    }

    /// Returns the kind of the capturing piece, if this move captures.
    #[inline(always)]
    pub const fn attacker(&self) -> Option<PieceKind> {
        match *self {
            Self::Capture { attacker, .. } => Some(attacker),
            Self::EnPassant | Self::Promotion { victim: Some(_), .. } => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

/// Parses a move in UCI notation (like `e2e4` or `e7e8q`), ensuring it is legal in `game`.
pub fn parse_move(game: &Game, uci: &str) -> Result<Move> {
    let uci = uci.trim();

    // Anything but a minor or major piece after the squares would not name a promotion
    match uci.get(4..) {
        None | Some("" | "n" | "b" | "r" | "q") => {}
        Some(suffix) => bail!("invalid move {uci:?}: unexpected suffix {suffix:?}"),
    }

    let mv = Move::from_uci(game, uci).with_context(|| format!("invalid move {uci:?}"))?;

    if !legal_moves(game).contains(&mv) {
        bail!("illegal move {uci:?} in position {:?}", game.to_fen());
    }

    Ok(mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_position;

    fn classify(fen: &str, uci: &str) -> MoveClass {
        let game = parse_position(fen).unwrap();
        let mv = parse_move(&game, uci).unwrap();
        MoveClass::new(&game, mv)
    }

    #[test]
    fn test_classify_quiet_and_capture() {
        let fen = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1";
        assert_eq!(classify(fen, "e4e5"), MoveClass::Quiet);
        assert_eq!(
            classify(fen, "e4d5"),
            MoveClass::Capture {
                attacker: PieceKind::Pawn,
                victim: PieceKind::Pawn
            }
        );
    }

    #[test]
    fn test_classify_en_passant() {
        let class = classify("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6");
        assert_eq!(class, MoveClass::EnPassant);
        assert!(class.is_capture());
        assert_eq!(class.victim(), Some(PieceKind::Pawn));
    }

    #[test]
    fn test_classify_promotion() {
        let class = classify("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7b8n");
        assert_eq!(
            class,
            MoveClass::Promotion {
                promote_to: PieceKind::Knight,
                victim: Some(PieceKind::Rook)
            }
        );

        let class = classify("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8q");
        assert!(!class.is_capture());
    }

    #[test]
    fn test_classify_castle() {
        let class = classify("4k3/8/8/8/8/8/8/4K2R w K - 0 1", "e1g1");
        assert_eq!(class, MoveClass::Castle);
        assert!(!class.is_capture());
    }

    #[test]
    fn test_parse_illegal_move() {
        let game = parse_position(crate::board::FEN_STARTPOS).unwrap();
        assert!(parse_move(&game, "e2e5").is_err());
        assert!(parse_move(&game, "garbage").is_err());
        assert!(parse_move(&game, "e2e4").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_promotion_suffix() {
        let game = parse_position("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(parse_move(&game, "a7a8k").is_err());
        assert!(parse_move(&game, "a7a8p").is_err());
        assert!(parse_move(&game, "a7a8qq").is_err());
        assert!(parse_move(&game, "a7a8").is_err(), "a promotion must name its piece");
        assert_eq!(parse_move(&game, "a7a8r").unwrap().promotion(), Some(PieceKind::Rook));
    }

    #[test]
    fn test_capturing_piece() {
        let fen = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1";
        assert_eq!(classify(fen, "e4d5").attacker(), Some(PieceKind::Pawn));
        assert_eq!(classify(fen, "e4e5").attacker(), None);

        let class = classify("4k3/8/8/8/8/8/3p4/4KB2 w - - 0 1", "e1d2");
        assert_eq!(class.attacker(), Some(PieceKind::King));
        assert_eq!(class.victim(), Some(PieceKind::Pawn));
    }
}
