/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::str::FromStr;

use clap::Parser;
use uci_parser::UciCommand;

/// Everything the engine can be asked to do.
///
/// Each variant except [`EngineCommand::Uci`] is also a command-line subcommand,
/// so `kestrel bench --depth 3` runs a benchmark before reading `stdin`.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND> | <UCI COMMAND>")
)]
pub enum EngineCommand {
    /// Search a fixed set of positions and report node counts and speed.
    Bench {
        /// Print the totals as a table.
        #[arg(short, long)]
        pretty: bool,

        /// Depth to search each position to.
        #[arg(short, long)]
        depth: Option<u8>,
    },

    /// Print the board.
    #[command(alias = "d")]
    Display,

    /// Print the static evaluation of the board, in centipawns.
    Eval {
        /// Also print every piece's value and each evaluation term.
        #[arg(short, long)]
        pretty: bool,
    },

    /// Stop the engine.
    Exit {
        /// Let the current search finish first.
        #[arg(short, long)]
        cleanup: bool,
    },

    /// Print the board as FEN.
    Fen,

    /// Print transposition table usage and hit rate.
    #[command(aliases = ["tt", "ttable"])]
    HashInfo,

    /// List the legal moves.
    Moves {
        /// List moves in search order: captures by MVV-LVA, then quiet moves.
        #[arg(short, long)]
        ordered: bool,
    },

    /// Print the value of an option, such as `option Clear Hash`.
    Option {
        /// Option name. May contain spaces.
        #[arg(required = true)]
        name: Vec<String>,
    },

    /// Count the leaf nodes of the move tree to `depth`.
    Perft { depth: usize },

    /// Like `perft`, but also print the count below each root move.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Print whether the game is ongoing, drawn, or won.
    Status,

    /// A command from the UCI protocol.
    #[command(skip)]
    Uci { cmd: UciCommand },

    /// Block until the current search finishes.
    ///
    /// Useful on the command line, e.g. `kestrel "go depth 5" wait exit`.
    Wait,
}

impl FromStr for EngineCommand {
    type Err = clap::Error;

    /// Parses `s` as an engine command, or as a UCI command if that fails.
    ///
    /// The error from the engine command parser is returned if neither succeeds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse_from(s.split_ascii_whitespace()).or_else(|err| {
            UciCommand::new(s)
                .map(|cmd| Self::Uci { cmd })
                .map_err(|_| err)
        })
    }
}
