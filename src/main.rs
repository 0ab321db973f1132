/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::{error::ErrorKind, Parser};
use kestrel::{Engine, EngineCommand};

/// Splits command-line arguments into commands.
///
/// At each position the longest run of arguments that parses as an [`EngineCommand`] wins,
/// so `bench --depth 3 fen` is two commands. A lone argument that is not an engine command
/// is tried as a whole UCI command, as in `"go depth 5"`.
fn parse_args(args: &[String]) -> Vec<EngineCommand> {
    let mut commands = Vec::new();
    let mut start = 0;

    while start < args.len() {
        let longest = (start + 1..=args.len()).rev().find_map(|end| {
            match EngineCommand::try_parse_from(&args[start..end]) {
                Ok(cmd) => Some((end, Ok(cmd))),
                // `--help` and `--version` are reported by clap as errors
                Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                    Some((end, Err(e)))
                }
                Err(_) => None,
            }
        });

        match longest {
            Some((end, Ok(cmd))) => {
                commands.push(cmd);
                start = end;
            }
            Some((end, Err(help))) => {
                println!("{help}");
                start = end;
            }
            None => {
                match args[start].parse::<EngineCommand>() {
                    Ok(cmd) => commands.push(cmd),
                    Err(e) => eprintln!("Ignoring argument {:?}:\n{e}", args[start]),
                }
                start += 1;
            }
        }
    }

    commands
}

fn main() {
    let mut engine = Engine::new();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for cmd in parse_args(&args) {
        if let Err(e) = engine.send_command(cmd) {
            eprintln!("{e:#}");
        }
    }

    if let Err(e) = engine.run() {
        eprintln!("{} stopped after an error: {e:#}", engine.name());
    }
}
