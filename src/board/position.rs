/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use anyhow::{bail, Context, Result};
use chessie::{CastlingRights, Color, Game, Move, Piece, PieceKind, Square, ZobristKey};

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Number of files (and ranks) on a chess board.
pub const BOARD_WIDTH: usize = 8;

/// Parses a FEN string into a [`Game`], rejecting it if it does not describe a valid position.
///
/// No search ever begins on a position that fails here.
pub fn parse_position(fen: &str) -> Result<Game> {
    let game = Game::from_fen(fen)
        .with_context(|| format!("invalid position: failed to parse FEN {fen:?}"))?;

    validate(&game)?;

    Ok(game)
}

/// Ensures that `game` describes a position the engine can search.
///
/// A valid position has exactly one King per side, no Pawns on the first or eighth rank,
/// and no more than 8 Pawns or 16 pieces per side.
pub fn validate(game: &Game) -> Result<()> {
    let board = Mailbox::new(game);

    for color in [Color::White, Color::Black] {
        let name = color_name(color);

        let kings = board.count(color, PieceKind::King);
        if kings != 1 {
            bail!("invalid position: {name} has {kings} kings");
        }

        let pawns = board.count(color, PieceKind::Pawn);
        if pawns > 8 {
            bail!("invalid position: {name} has {pawns} pawns");
        }

        let pieces = board.iter().filter(|(_, p)| p.color() == color).count();
        if pieces > 16 {
            bail!("invalid position: {name} has {pieces} pieces");
        }
    }

    let back_rank_pawn = board.iter().find(|&(index, piece)| {
        let rank = index / BOARD_WIDTH;
        piece.kind() == PieceKind::Pawn && (rank == 0 || rank == BOARD_WIDTH - 1)
    });

    if let Some((index, _)) = back_rank_pawn {
        bail!(
            "invalid position: pawn on back rank at {}",
            square_name(index)
        );
    }

    Ok(())
}

/// Returns all legal moves in `game`.
///
/// Moves that would capture a King are never part of the legal move set.
/// They can only be generated in malformed positions (such as adjacent Kings),
/// and removing them keeps the King on the board for the rest of the search.
pub fn legal_moves(game: &Game) -> Vec<Move> {
    game.get_legal_moves()
        .into_iter()
        .filter(|mv| {
            !matches!(game.piece_at(mv.to()), Some(piece) if piece.kind() == PieceKind::King)
        })
        .collect()
}

/// The state of a game with respect to whether it has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// The side to move has at least one legal move and mate is still possible.
    Ongoing,

    /// The side to move is in check and has no legal moves.
    Checkmate {
        /// The side that delivered mate.
        winner: Color,
    },

    /// The side to move is not in check but has no legal moves.
    Stalemate,

    /// Neither side has enough material left to deliver mate.
    InsufficientMaterial,
}

impl GameStatus {
    /// Returns `true` if the game is over.
    #[inline(always)]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// Returns `true` if the game ended in a draw.
    #[inline(always)]
    pub const fn is_draw(&self) -> bool {
        matches!(self, Self::Stalemate | Self::InsufficientMaterial)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::Checkmate { winner } => write!(f, "checkmate ({} wins)", color_name(*winner)),
            Self::Stalemate => write!(f, "stalemate"),
            Self::InsufficientMaterial => write!(f, "draw by insufficient material"),
        }
    }
}

/// Determines whether the game has ended, and how.
///
/// This is the only terminal detection in the engine: the evaluator and callers reporting
/// game-over both go through here.
pub fn status(game: &Game) -> GameStatus {
    if legal_moves(game).is_empty() {
        if game.is_in_check() {
            GameStatus::Checkmate {
                winner: game.side_to_move().opponent(),
            }
        } else {
            GameStatus::Stalemate
        }
    } else if is_insufficient_material(&Mailbox::new(game)) {
        GameStatus::InsufficientMaterial
    } else {
        GameStatus::Ongoing
    }
}

/// Returns `true` if there is insufficient material on the board to cause a checkmate.
///
/// That is the case for lone Kings, a single minor piece, or any number of Bishops that
/// all stand on squares of the same color.
pub fn is_insufficient_material(board: &Mailbox) -> bool {
    let mut knights = 0;
    let mut bishops = 0;
    let mut bishop_square_colors = [false; 2];

    for (index, piece) in board.iter() {
        match piece.kind() {
            PieceKind::King => {}
            PieceKind::Knight => knights += 1,
            PieceKind::Bishop => {
                bishops += 1;
                bishop_square_colors[(index / BOARD_WIDTH + index % BOARD_WIDTH) % 2] = true;
            }
            // Pawns, Rooks, and Queens can always force mate
            _ => return false,
        }
    }

    match (knights, bishops) {
        // Lone kings, or a single minor piece
        (0, 0) | (1, 0) | (0, 1) => true,

        // Bishops only, as long as they never cover both square colors
        (0, _) => !(bishop_square_colors[0] && bishop_square_colors[1]),

        _ => false,
    }
}

/// Canonical identity of a position, used to key the transposition table.
///
/// Holds everything the first four FEN fields describe: placement, side to move,
/// castling rights, and en passant square. Move counters are left out so that
/// transpositions share a key.
///
/// Hashing uses only the Zobrist key, but equality compares the full state, so two
/// positions whose Zobrist keys collide still get different table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionKey {
    zobrist: ZobristKey,
    board: Mailbox,
    side_to_move: Color,
    castling: [CastlingRights; Color::COUNT],
    ep_square: Option<Square>,
}

impl PositionKey {
    /// Computes the key of the provided [`Game`].
    pub fn new(game: &Game) -> Self {
        Self {
            zobrist: game.key(),
            board: Mailbox::new(game),
            side_to_move: game.side_to_move(),
            castling: *game.castling_rights(),
            ep_square: game.ep_square(),
        }
    }

    /// The Zobrist hash of this position.
    #[inline(always)]
    pub const fn zobrist(&self) -> ZobristKey {
        self.zobrist
    }
}

impl Hash for PositionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.zobrist.hash(state);
    }
}

/// A square-indexed snapshot of all pieces on the board.
///
/// Index 0 is A1, index 7 is H1, and index 63 is H8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mailbox([Option<Piece>; Square::COUNT]);

impl Mailbox {
    /// Takes a snapshot of the pieces in `game`.
    pub fn new(game: &Game) -> Self {
        let mut squares = [None; Square::COUNT];

        for square in Square::iter() {
            squares[square.index()] = game.piece_at(square);
        }

        Self(squares)
    }

    /// Fetches the piece at the provided square index, if there is one.
    #[inline(always)]
    pub const fn get(&self, index: usize) -> Option<Piece> {
        self.0[index]
    }

    /// Iterates over every occupied square, yielding its index and piece.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = (usize, Piece)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(index, piece)| piece.map(|piece| (index, piece)))
    }

    /// Iterates over the squares holding a `color` piece of the provided kind.
    #[inline(always)]
    pub fn squares_of(&self, color: Color, kind: PieceKind) -> impl Iterator<Item = usize> + '_ {
        self.iter()
            .filter(move |(_, piece)| piece.color() == color && piece.kind() == kind)
            .map(|(index, _)| index)
    }

    /// Counts the pieces of `color` and `kind`.
    #[inline(always)]
    pub fn count(&self, color: Color, kind: PieceKind) -> usize {
        self.squares_of(color, kind).count()
    }

    /// Counts the pieces of `kind`, regardless of color.
    #[inline(always)]
    pub fn count_kind(&self, kind: PieceKind) -> usize {
        self.count(Color::White, kind) + self.count(Color::Black, kind)
    }
}

/// Returns `1` for White and `-1` for Black.
#[inline(always)]
pub const fn sign_of(color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Returns the name of a color, capitalized.
#[inline(always)]
pub const fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Formats a square index in algebraic notation (`a1` through `h8`).
pub fn square_name(index: usize) -> String {
    let file = (b'a' + (index % BOARD_WIDTH) as u8) as char;
    let rank = index / BOARD_WIDTH + 1;
    format!("{file}{rank}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_move;

    #[test]
    fn test_parse_startpos() {
        let game = parse_position(FEN_STARTPOS).unwrap();
        assert_eq!(legal_moves(&game).len(), 20);
        assert_eq!(status(&game), GameStatus::Ongoing);
    }

    #[test]
    fn test_malformed_fen_is_rejected() {
        let res = parse_position("this is not a fen");
        assert!(res.is_err(), "Garbage input must fail to parse");

        let err = format!("{:#}", res.unwrap_err());
        assert!(err.contains("invalid position"), "Unexpected error: {err}");
    }

    #[test]
    fn test_extra_king_is_rejected() {
        let err = parse_position("4k3/8/8/8/8/8/8/K3K3 w - - 0 1").unwrap_err();
        assert!(format!("{err:#}").contains("invalid position"), "{err:#}");
    }

    #[test]
    fn test_back_rank_pawn_is_rejected() {
        let err = parse_position("4k2P/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err();
        assert!(format!("{err:#}").contains("invalid position"), "{err:#}");

        let err = parse_position("4k3/8/8/8/8/8/8/p3K3 w - - 0 1").unwrap_err();
        assert!(format!("{err:#}").contains("invalid position"), "{err:#}");
    }

    #[test]
    fn test_too_many_pawns_is_rejected() {
        let err = parse_position("4k3/8/8/8/7P/8/PPPPPPPP/4K3 w - - 0 1").unwrap_err();
        assert!(format!("{err:#}").contains("invalid position"), "{err:#}");
    }

    #[test]
    fn test_status_checkmate() {
        let game = parse_position("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(
            status(&game),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
        assert!(status(&game).is_terminal());
    }

    #[test]
    fn test_status_stalemate() {
        let game = parse_position("k7/8/KQ6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(status(&game), GameStatus::Stalemate);
        assert!(status(&game).is_draw());
    }

    #[test]
    fn test_insufficient_material() {
        let cases = [
            ("8/4k3/8/8/3K4/8/8/8 w - - 0 1", true),
            ("8/4k3/8/8/3K4/8/5B2/8 w - - 0 1", true),
            ("8/4k3/2n5/8/3K4/8/8/8 w - - 0 1", true),
            ("8/2b1k3/8/8/3K4/8/5B2/8 w - - 0 1", true),
            ("8/3bk3/8/8/3K4/8/5B2/8 w - - 0 1", false),
            ("8/4k3/8/8/3K4/8/4P3/8 w - - 0 1", false),
            ("8/4k3/2n5/8/3K4/8/5B2/8 w - - 0 1", false),
        ];

        for (fen, expected) in cases {
            let game = parse_position(fen).unwrap();
            assert_eq!(
                is_insufficient_material(&Mailbox::new(&game)),
                expected,
                "Insufficient material check failed on {fen}"
            );
        }
    }

    #[test]
    fn test_adjacent_kings_cannot_be_captured() {
        let game = parse_position("8/8/8/8/8/8/3K4/3k4 w - - 0 1").unwrap();
        let moves = legal_moves(&game);

        assert!(!moves.is_empty());
        for mv in moves {
            assert_ne!(mv.to_string(), "d2d1", "King capture must not be legal");
        }
    }

    #[test]
    fn test_position_key_ignores_move_counters() {
        let a = parse_position("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let b = parse_position("4k3/8/8/8/8/8/8/4K2R w K - 12 40").unwrap();
        let c = parse_position("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
        let d = parse_position("4k3/8/8/8/8/8/8/4K2R b K - 0 1").unwrap();

        assert_eq!(PositionKey::new(&a), PositionKey::new(&b));
        assert_ne!(
            PositionKey::new(&a),
            PositionKey::new(&c),
            "Castling rights are part of a position's identity"
        );
        assert_ne!(
            PositionKey::new(&a),
            PositionKey::new(&d),
            "Side to move is part of a position's identity"
        );
    }

    #[test]
    fn test_position_key_after_transposition() {
        let start = parse_position(FEN_STARTPOS).unwrap();
        let shuffled = ["g1f3", "b8c6", "f3g1", "c6b8"]
            .into_iter()
            .fold(start, |game, uci| {
                game.with_move_made(parse_move(&game, uci).unwrap())
            });

        assert_ne!(start.to_fen(), shuffled.to_fen());
        assert_eq!(PositionKey::new(&start), PositionKey::new(&shuffled));
        assert_eq!(
            PositionKey::new(&start).zobrist(),
            PositionKey::new(&shuffled).zobrist()
        );

        let ep = parse_position("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let no_ep = parse_position("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1").unwrap();
        assert_ne!(PositionKey::new(&ep), PositionKey::new(&no_ep));
    }

    #[test]
    fn test_mailbox_indexing() {
        let game = parse_position(FEN_STARTPOS).unwrap();
        let board = Mailbox::new(&game);

        assert_eq!(board.get(4).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(board.get(4).map(|p| p.color()), Some(Color::White));
        assert_eq!(board.get(60).map(|p| p.color()), Some(Color::Black));
        assert_eq!(board.count_kind(PieceKind::Pawn), 16);
        assert_eq!(square_name(0), "a1");
        assert_eq!(square_name(63), "h8");
    }
}
