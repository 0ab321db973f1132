/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use chessie::{Color, Game, PieceKind};

use crate::{
    board::{color_name, sign_of, status, GameStatus, Mailbox, BOARD_WIDTH},
    tune, Psqt, Score,
};

/// Scores a chess position from White's perspective.
///
/// This is a pure function of the position: it never mutates `game`, and two calls on the same
/// position always agree.
#[inline(always)]
pub fn evaluate(game: &Game) -> Score {
    Evaluator::new(game).eval()
}

/// Encapsulates the logic of scoring a chess position.
///
/// Scores are absolute: a high score is good for White, and a low score is good for Black,
/// regardless of whose turn it is.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    /// The game whose position to evaluate.
    game: &'a Game,

    /// Snapshot of the pieces on the board.
    board: Mailbox,

    /// Whether the game has ended, which overrides every other term.
    status: GameStatus,

    /// Whether the position is considered an endgame.
    pub(crate) endgame: bool,
}

/// The individual components of an evaluation, all in centipawns from White's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalTerms {
    pub material: i32,
    pub placement: i32,
    pub pawn_structure: i32,
    pub king_safety: i32,
    pub mobility: i32,
    pub bishop_pair: i32,
}

impl EvalTerms {
    /// Sums all terms into a single [`Score`].
    #[inline(always)]
    pub const fn total(&self) -> Score {
        Score::new(
            self.material
                + self.placement
                + self.pawn_structure
                + self.king_safety
                + self.mobility
                + self.bishop_pair,
        )
    }
}

impl<'a> Evaluator<'a> {
    /// Construct a new [`Evaluator`], computing any important metadata.
    #[inline(always)]
    pub fn new(game: &'a Game) -> Self {
        let board = Mailbox::new(game);

        Self {
            game,
            board,
            status: status(game),
            endgame: is_endgame(&board),
        }
    }

    /// Evaluate this position from White's perspective.
    ///
    /// Checkmate is worth [`Score::MATE`] to the side that delivered it.
    /// Stalemate and insufficient material are worth exactly [`Score::DRAW`].
    #[inline(always)]
    pub fn eval(&self) -> Score {
        match self.status {
            GameStatus::Checkmate { winner } => Score::MATE * sign_of(winner),
            status if status.is_draw() => Score::DRAW,
            _ => self.terms().total(),
        }
    }

    /// Computes every positional term of this evaluation, ignoring whether the game has ended.
    pub fn terms(&self) -> EvalTerms {
        EvalTerms {
            material: self.material(),
            placement: self.placement(),
            pawn_structure: self.pawn_structure(),
            king_safety: self.king_safety(),
            mobility: self.mobility(),
            bishop_pair: self.bishop_pair(),
        }
    }

    /// Difference in material between the two sides.
    fn material(&self) -> i32 {
        self.board
            .iter()
            .map(|(_, piece)| value_of(piece.kind()) * sign_of(piece.color()))
            .sum()
    }

    /// Sum of every piece's Piece-Square Table bonus.
    fn placement(&self) -> i32 {
        self.board
            .iter()
            .map(|(index, piece)| Psqt::eval(piece, index, self.endgame) * sign_of(piece.color()))
            .sum()
    }

    /// Doubled, isolated, and passed pawns for both sides.
    fn pawn_structure(&self) -> i32 {
        let mut score = 0;

        for color in [Color::White, Color::Black] {
            let mut files = [0; BOARD_WIDTH];
            for index in self.board.squares_of(color, PieceKind::Pawn) {
                files[index % BOARD_WIDTH] += 1;
            }

            let mut side = 0;

            for index in self.board.squares_of(color, PieceKind::Pawn) {
                let (file, rank) = (index % BOARD_WIDTH, index / BOARD_WIDTH);

                if files[file] > 1 {
                    side -= tune::doubled_pawn_penalty!();
                }

                let left = file > 0 && files[file - 1] > 0;
                let right = file < BOARD_WIDTH - 1 && files[file + 1] > 0;
                if !left && !right {
                    side -= tune::isolated_pawn_penalty!();
                }

                if self.is_passed(color, file, rank) {
                    let advance = match color {
                        Color::White => rank,
                        Color::Black => BOARD_WIDTH - 1 - rank,
                    } as i32;

                    side += tune::passed_pawn_base!() + tune::passed_pawn_per_rank!() * advance;
                }
            }

            score += side * sign_of(color);
        }

        score
    }

    /// A pawn is passed if no enemy pawn on its own or an adjacent file stands ahead of it.
    fn is_passed(&self, color: Color, file: usize, rank: usize) -> bool {
        !self
            .board
            .squares_of(color.opponent(), PieceKind::Pawn)
            .any(|enemy| {
                let (enemy_file, enemy_rank) = (enemy % BOARD_WIDTH, enemy / BOARD_WIDTH);
                let ahead = match color {
                    Color::White => enemy_rank > rank,
                    Color::Black => enemy_rank < rank,
                };

                enemy_file.abs_diff(file) <= 1 && ahead
            })
    }

    /// Friendly pawns shielding each King. Ignored in the endgame.
    fn king_safety(&self) -> i32 {
        if self.endgame {
            return 0;
        }

        let mut score = 0;

        for color in [Color::White, Color::Black] {
            for king in self.board.squares_of(color, PieceKind::King) {
                let (file, rank) = (king % BOARD_WIDTH, king / BOARD_WIDTH);

                let Some(shield_rank) = rank.checked_add_signed(sign_of(color) as isize) else {
                    continue;
                };
                if shield_rank >= BOARD_WIDTH {
                    continue;
                }

                let first = file.saturating_sub(1);
                let last = (file + 1).min(BOARD_WIDTH - 1);

                let shield = (first..=last)
                    .filter_map(|f| self.board.get(shield_rank * BOARD_WIDTH + f))
                    .filter(|p| p.color() == color && p.kind() == PieceKind::Pawn)
                    .count() as i32;

                score += shield * tune::pawn_shield_bonus!() * sign_of(color);
            }
        }

        score
    }

    /// Minor and major pieces standing on the central 4x4 squares.
    fn mobility(&self) -> i32 {
        const CENTER: std::ops::RangeInclusive<usize> = 2..=5;

        self.board
            .iter()
            .filter(|(_, piece)| {
                !matches!(piece.kind(), PieceKind::Pawn | PieceKind::King)
            })
            .filter(|(index, _)| {
                CENTER.contains(&(index % BOARD_WIDTH)) && CENTER.contains(&(index / BOARD_WIDTH))
            })
            .map(|(_, piece)| tune::center_mobility_bonus!() * sign_of(piece.color()))
            .sum()
    }

    /// Bonus for each side holding at least two Bishops.
    fn bishop_pair(&self) -> i32 {
        [Color::White, Color::Black]
            .into_iter()
            .filter(|&color| self.board.count(color, PieceKind::Bishop) >= 2)
            .map(|color| tune::bishop_pair_bonus!() * sign_of(color))
            .sum()
    }
}

impl fmt::Display for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  +")?;
        for _ in 0..BOARD_WIDTH {
            write!(f, "-----+")?;
        }
        writeln!(f)?;

        for rank in (0..BOARD_WIDTH).rev() {
            write!(f, "{} |", rank + 1)?;

            // Step 1: Write the piece char
            for file in 0..BOARD_WIDTH {
                let piece = self.board.get(rank * BOARD_WIDTH + file);
                let piece_char = piece.map(|p| p.char()).unwrap_or(' ');
                write!(f, "  {piece_char}  |")?;
            }
            writeln!(f)?;
            write!(f, "  |")?;

            // Step 2: Write the material and placement value of that piece
            for file in 0..BOARD_WIDTH {
                let index = rank * BOARD_WIDTH + file;
                let value = self.board.get(index).map(|piece| {
                    let value = value_of(piece.kind()) + Psqt::eval(piece, index, self.endgame);
                    Score::new(value * sign_of(piece.color()))
                });

                match value {
                    Some(value) => write!(f, "{:^5}|", format!("{value:#}"))?,
                    None => write!(f, "     |")?,
                }
            }
            writeln!(f)?;

            write!(f, "  +")?;
            for _ in 0..BOARD_WIDTH {
                write!(f, "-----+")?;
            }
            writeln!(f)?;
        }
        for file in 'a'..='h' {
            write!(f, "     {file}")?;
        }

        let terms = self.terms();
        let score = self.eval();

        writeln!(f, "\n")?;
        writeln!(f, "Status:         {}", self.status)?;
        writeln!(f, "Endgame:        {}", self.endgame)?;
        writeln!(f, "Material:       {}", terms.material)?;
        writeln!(f, "Placement:      {}", terms.placement)?;
        writeln!(f, "Pawn structure: {}", terms.pawn_structure)?;
        writeln!(f, "King safety:    {}", terms.king_safety)?;
        writeln!(f, "Mobility:       {}", terms.mobility)?;
        writeln!(f, "Bishop pair:    {}", terms.bishop_pair)?;

        let winning_side = if score > Score::DRAW {
            Some(Color::White)
        } else if score < Score::DRAW {
            Some(Color::Black)
        } else {
            None
        };

        writeln!(
            f,
            "Winning side:   {}",
            winning_side.map(color_name).unwrap_or("N/A")
        )?;
        write!(f, "Side to move:   {}", color_name(self.game.side_to_move()))
    }
}

/// Returns a value of the provided `PieceKind`.
///
/// Values are obtained from here: <https://www.chessprogramming.org/Simplified_Evaluation_Function>
#[inline(always)]
pub const fn value_of(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 0, // King is invaluable, but 0 is easier to work with in computations
    }
}

/// An endgame has no Queens, or at most two Queens with no more than two minor pieces and Rooks combined.
#[inline(always)]
pub fn is_endgame(board: &Mailbox) -> bool {
    let queens = board.count_kind(PieceKind::Queen);
    let others = board.count_kind(PieceKind::Knight)
        + board.count_kind(PieceKind::Bishop)
        + board.count_kind(PieceKind::Rook);

    queens == 0 || (queens <= 2 && others <= 2)
}
