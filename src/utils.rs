/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Positions searched by the `bench` command.
///
/// A mix of openings, middlegames with tactics, and sparse endgames.
pub const BENCHMARK_FENS: [&str; 12] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2",
    "r2q1rk1/ppp2ppp/2n1bn2/2bpp3/4P3/2PP1NP1/PP1N1PBP/R1BQ1RK1 w - - 0 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "2kr3r/pp1q1ppp/2n1pn2/3p4/3P4/2PBPN2/PP3PPP/R2Q1RK1 b - - 3 13",
    "6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "8/8/4k3/8/2p5/8/B2P2K1/8 w - - 0 1",
    "4k3/8/2p5/3q4/4P3/8/8/4K3 w - - 0 1",
    "8/8/8/8/8/8/3K4/3k4 w - - 0 1",
];

/// Controls how much output a search prints.
///
/// Implemented by marker types so that disabled logging is compiled out of the search entirely.
pub trait LogLevel {
    /// Whether to print search progress and the final `bestmove`.
    const INFO: bool;

    /// Whether to print search limits, cancellations, and cache statistics.
    const DEBUG: bool;
}

/// Prints nothing.
pub struct LogNone;

/// Prints standard UCI output.
pub struct LogInfo;

/// Prints standard UCI output and extra diagnostics as `info string`s.
pub struct LogDebug;

impl LogLevel for LogNone {
    const INFO: bool = false;
    const DEBUG: bool = false;
}

impl LogLevel for LogInfo {
    const INFO: bool = true;
    const DEBUG: bool = false;
}

impl LogLevel for LogDebug {
    const INFO: bool = true;
    const DEBUG: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_position;

    #[test]
    fn test_benchmark_positions_are_valid() {
        for fen in BENCHMARK_FENS {
            assert!(parse_position(fen).is_ok(), "Invalid benchmark FEN {fen:?}");
        }
    }
}
