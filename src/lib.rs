/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! A compact minimax chess engine.
//!
//! Positions are searched with alpha-beta pruning and a capture-only quiescence search,
//! using a hand-crafted evaluation that is always from White's perspective.
//! Results are cached in a [`TTable`] that may be shared between searches.
//!
//! The simplest entrypoint is [`find_best_move`]:
//!
//! ```
//! use kestrel::{board::parse_position, find_best_move, TTable};
//!
//! let game = parse_position("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
//! let ttable = TTable::new(1);
//!
//! let bestmove = find_best_move(&game, 2, &ttable).unwrap();
//! assert_eq!(bestmove.unwrap().to_string(), "a1a8");
//! ```

/// Board representation helpers built on top of [`chessie`].
pub mod board;

/// Command-line interface of the engine.
mod cli;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Evaluation of chess positions.
mod eval;

/// Move ordering.
mod movepicker;

/// Piece-square tables.
mod psqt;

/// Centipawn scores.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Transposition table.
mod ttable;

/// Tunable evaluation weights and time-control parameters.
mod tune;

/// Misc utility functions, constants, and types.
mod utils;

pub use cli::*;
pub use engine::*;
pub use eval::*;
pub use movepicker::*;
pub use psqt::*;
pub use score::*;
pub use search::*;
pub use ttable::*;
pub use utils::*;
