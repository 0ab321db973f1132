/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    io::{self, BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use chessie::{print_perft, Game};
use clap::Parser;
use uci_parser::{UciCommand, UciOption, UciParseError, UciResponse};

use crate::{
    board::{color_name, legal_moves, parse_move, parse_position, status},
    order_moves, EngineCommand, Evaluator, LogDebug, LogInfo, LogLevel, LogNone, Search,
    SearchConfig, SearchResult, TTable, BENCHMARK_FENS,
};

/// Search depth used by `bench` when none is given.
const BENCH_DEPTH: u8 = 4;

/// Engine name and version, as reported to `uci`.
const ENGINE_NAME: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// The Kestrel chess engine.
///
/// Commands arrive over a channel, either from the `stdin` reader spawned by [`Engine::run`]
/// or from [`Engine::send_command`]. Searches run on their own thread and share the
/// engine's [`TTable`].
#[derive(Debug)]
pub struct Engine {
    /// Position that `go` will search.
    game: Game,

    sender: Sender<EngineCommand>,
    receiver: Receiver<EngineCommand>,

    /// Cleared to ask a running search to stop.
    is_searching: Arc<AtomicBool>,

    /// Thread of the most recent search, until it is joined.
    search_thread: Option<JoinHandle<SearchResult>>,

    ttable: Arc<TTable>,

    /// Set by `debug on`. Selects [`LogDebug`] for searches.
    debug: bool,
}

impl Engine {
    /// Creates an engine on the starting position with a default-sized [`TTable`].
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();

        Self {
            game: Game::default(),
            sender,
            receiver,
            is_searching: Arc::new(AtomicBool::new(false)),
            search_thread: None,
            ttable: Arc::new(TTable::default()),
            debug: false,
        }
    }

    /// Engine name and version.
    pub fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    /// Comma-separated list of the engine's authors.
    pub fn authors(&self) -> String {
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    }

    /// Queues `command` to be executed by [`Engine::run`].
    ///
    /// Fails only if the engine's event loop has already shut down.
    pub fn send_command(&self, command: EngineCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| anyhow!("{ENGINE_NAME} is no longer accepting commands"))
    }

    /// Runs the engine until it receives `quit`/`exit` or `stdin` closes.
    ///
    /// Input is read on a separate thread, so `stop` is handled while a search is running.
    pub fn run(&mut self) -> Result<()> {
        let sender = self.sender.clone();
        thread::spawn(move || {
            if let Err(err) = read_input(io::stdin().lock(), &sender) {
                eprintln!("Stopped reading input: {err:#}");
            }
        });

        while let Ok(cmd) = self.receiver.recv() {
            if let ControlFlow::Quit = self.execute(cmd)? {
                break;
            }
        }

        Ok(())
    }

    /// Executes a single command. Errors from UCI commands are reported and swallowed.
    fn execute(&mut self, cmd: EngineCommand) -> Result<ControlFlow> {
        match cmd {
            EngineCommand::Bench { depth, pretty } => {
                let bench = self.bench(depth.unwrap_or(BENCH_DEPTH))?;
                if pretty {
                    println!("{bench:#}");
                } else {
                    println!("{bench}");
                }
            }

            EngineCommand::Display => println!("{}", self.game),

            EngineCommand::Eval { pretty } => {
                let evaluator = Evaluator::new(&self.game);
                let score = evaluator.eval();
                if pretty {
                    println!("{evaluator}\n\nScore: {score} ({score:#})");
                } else {
                    println!("{score}");
                }
            }

            EngineCommand::Exit { cleanup } => {
                if cleanup {
                    self.stop_search();
                }
                return Ok(ControlFlow::Quit);
            }

            EngineCommand::Fen => println!("{}", self.game.to_fen()),

            EngineCommand::HashInfo => self.hash_info(),

            EngineCommand::Moves { ordered } => println!("{}", self.moves(ordered)),

            EngineCommand::Option { name } => {
                let name = name.join(" ");
                match self.get_option(&name) {
                    Some(value) => println!("{name} = {value}"),
                    None => println!("{ENGINE_NAME} has no option {name:?}"),
                }
            }

            EngineCommand::Perft { depth } => {
                print_perft::<false, false>(&self.game, depth);
            }

            EngineCommand::Splitperft { depth } => {
                print_perft::<false, true>(&self.game, depth);
            }

            EngineCommand::Status => println!("{}", describe_status(&self.game)),

            EngineCommand::Uci { cmd } => match self.handle_uci_command(cmd) {
                Ok(flow) => return Ok(flow),
                Err(e) => eprintln!("Error: {e:#}"),
            },

            EngineCommand::Wait => _ = self.stop_search(),
        }

        Ok(ControlFlow::Continue)
    }

    fn handle_uci_command(&mut self, uci: UciCommand) -> Result<ControlFlow> {
        match uci {
            UciCommand::Uci => self.uci(),

            UciCommand::Debug(on) => self.debug = on,

            UciCommand::IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            UciCommand::SetOption { name, value } => {
                let option = EngineOption::parse(&name, value.as_deref())?;
                self.apply_option(option)?;

                if self.debug {
                    send_string(format!(
                        "{name} := {}",
                        value.as_deref().unwrap_or("<pressed>")
                    ));
                }
            }

            UciCommand::Register { .. } => println!("{ENGINE_NAME} does not need registering"),

            UciCommand::UciNewGame => self.new_game(),

            UciCommand::Position { fen, moves } => self.game = position(fen.as_deref(), &moves)?,

            UciCommand::Go(options) => {
                // `go perft <depth>` is a common extension
                if let Some(depth) = options.perft {
                    print_perft::<false, true>(&self.game, depth as usize);
                } else {
                    let config = SearchConfig::new(options, &self.game);
                    if self.debug {
                        self.start_search::<LogDebug>(self.game, config);
                    } else {
                        self.start_search::<LogInfo>(self.game, config);
                    }
                }
            }

            UciCommand::Stop => self.is_searching.store(false, Ordering::Relaxed),

            UciCommand::Quit => {
                self.is_searching.store(false, Ordering::Relaxed);
                return Ok(ControlFlow::Quit);
            }

            other => bail!("{ENGINE_NAME} does not support UCI command {other:?}"),
        }

        Ok(ControlFlow::Continue)
    }

    /// Searches every position in [`BENCHMARK_FENS`] to `depth`, starting each from an empty table.
    fn bench(&mut self, depth: u8) -> Result<Bench> {
        let config = SearchConfig {
            max_depth: depth,
            ..Default::default()
        };
        let width = BENCHMARK_FENS.iter().map(|fen| fen.len()).max().unwrap_or(0);
        let total = BENCHMARK_FENS.len();

        println!("Searching {total} positions to depth {depth}");

        let mut bench = Bench::default();
        for (i, fen) in BENCHMARK_FENS.into_iter().enumerate() {
            print!("{:>2}/{total}: {fen:<width$}  ", i + 1);
            io::stdout().flush().context("Failed to flush stdout")?;

            self.new_game();
            self.start_search::<LogNone>(parse_position(fen)?, config);

            let res = self
                .stop_search()
                .ok_or_else(|| anyhow!("Benchmark search on {fen:?} did not complete"))?;
            println!("{} nodes", res.nodes);

            bench.nodes += res.nodes;
        }
        bench.elapsed = config.starttime.elapsed();

        self.new_game();

        Ok(bench)
    }

    fn hash_info(&self) {
        let entries = self.ttable.num_entries();
        let capacity = self.ttable.capacity();
        let stats = self.ttable.stats();

        println!(
            "Hash: {}mb, {entries}/{capacity} slots used ({:.2}%)",
            self.ttable.size(),
            entries as f32 / capacity as f32 * 100.0
        );
        println!(
            "Probes: {} ({} hits, {:.2}%), collisions: {}",
            stats.accesses,
            stats.hits,
            stats.hit_rate(),
            stats.collisions
        );
    }

    /// Legal moves in the current position, joined by `, `.
    ///
    /// If `ordered`, moves are listed in the order the search would try them.
    fn moves(&self, ordered: bool) -> String {
        let mut moves = legal_moves(&self.game);
        if moves.is_empty() {
            return String::from("(none)");
        }

        if ordered {
            order_moves(&self.game, &mut moves);
        }

        moves
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Stops any search, clears the table and returns to the starting position.
    fn new_game(&mut self) {
        self.is_searching.store(false, Ordering::Relaxed);
        self.stop_search();
        self.ttable.clear();
        self.game = Game::default();
    }

    /// Spawns a search of `game`, unless one is already running.
    fn start_search<Log: LogLevel + 'static>(&mut self, game: Game, config: SearchConfig) {
        if self.is_searching.load(Ordering::Relaxed) {
            send_string("Ignoring `go`: a search is already running");
            return;
        }

        // The previous search may have finished without being joined
        self.stop_search();
        self.is_searching.store(true, Ordering::Relaxed);

        let is_searching = Arc::clone(&self.is_searching);
        let ttable = Arc::clone(&self.ttable);

        self.search_thread = Some(thread::spawn(move || {
            Search::<Log>::new(is_searching, config, &ttable).start(&game)
        }));
    }

    /// Blocks until the current search thread finishes, returning its result.
    fn stop_search(&mut self) -> Option<SearchResult> {
        let handle = self.search_thread.take()?;
        let res = handle.join();
        self.is_searching.store(false, Ordering::Relaxed);

        match res {
            Ok(res) => Some(res),
            Err(_) => {
                send_string("The search thread panicked");
                None
            }
        }
    }

    fn uci(&self) {
        println!("id name {ENGINE_NAME}");
        println!("id author {}", self.authors());

        for option in self.options() {
            println!("{}", UciResponse::Option(option));
        }

        println!("{}", UciResponse::<&str>::UciOk);
    }

    /// Options advertised in response to `uci`.
    fn options(&self) -> [UciOption; 3] {
        [
            UciOption::spin(
                "Hash",
                TTable::DEFAULT_SIZE as i32,
                TTable::MIN_SIZE as i32,
                TTable::MAX_SIZE as i32,
            ),
            UciOption::button("Clear Hash"),
            UciOption::spin("Threads", 1, 1, 1),
        ]
    }

    fn apply_option(&mut self, option: EngineOption) -> Result<()> {
        match option {
            EngineOption::Hash(mb) => {
                if self.is_searching.load(Ordering::Relaxed) {
                    bail!("Hash cannot be resized during a search");
                }
                self.ttable = Arc::new(TTable::new(mb));
            }

            EngineOption::ClearHash => self.ttable.clear(),

            // Only one search thread is supported
            EngineOption::Threads => {}
        }

        Ok(())
    }

    /// Current value of the option `name`, as it would be passed to `setoption`.
    fn get_option(&self, name: &str) -> Option<String> {
        match name {
            "Hash" => Some(self.ttable.size().to_string()),
            "Clear Hash" => Some(String::new()),
            "Threads" => Some(String::from("1")),
            _ => None,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the event loop keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlFlow {
    Continue,
    Quit,
}

/// A validated `setoption` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineOption {
    /// New table size, in megabytes.
    Hash(usize),
    ClearHash,
    Threads,
}

impl EngineOption {
    fn parse(name: &str, value: Option<&str>) -> Result<Self> {
        match (name, value) {
            ("Hash", Some(value)) => {
                let mb = value.parse::<usize>().with_context(|| {
                    format!("Hash must be a whole number of megabytes, got {value:?}")
                })?;

                if !(TTable::MIN_SIZE..=TTable::MAX_SIZE).contains(&mb) {
                    bail!(
                        "Hash must be between {}mb and {}mb, got {mb}mb",
                        TTable::MIN_SIZE,
                        TTable::MAX_SIZE
                    );
                }

                Ok(Self::Hash(mb))
            }
            ("Hash", None) => bail!("usage: setoption name Hash value <megabytes>"),

            ("Clear Hash", _) => Ok(Self::ClearHash),

            ("Threads", Some("1")) => Ok(Self::Threads),
            ("Threads", _) => bail!("{ENGINE_NAME} only supports 1 thread"),

            (name, _) => bail!("{ENGINE_NAME} has no option {name:?}"),
        }
    }
}

/// Totals from a `bench` run.
///
/// Displayed as a single line, or as a table with the alternate flag (`{:#}`).
#[derive(Debug, Clone, Copy, Default)]
struct Bench {
    nodes: u64,
    elapsed: Duration,
}

impl Bench {
    fn nps(&self) -> u64 {
        (self.nodes as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)) as u64
    }
}

impl fmt::Display for Bench {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.nodes;
        let nps = self.nps();
        let ms = self.elapsed.as_millis();

        if f.alternate() {
            writeln!(f, "+------- bench -------+")?;
            writeln!(f, "| nodes  {nodes:>12} |")?;
            writeln!(f, "| ms     {ms:>12} |")?;
            writeln!(f, "| nps    {nps:>12} |")?;
            write!(f, "+---------------------+")
        } else {
            write!(f, "{nodes} nodes {nps} nps")
        }
    }
}

/// Builds the position for `position [fen <fen> | startpos] [moves ...]`.
///
/// The FEN is validated and every move must be legal in turn.
fn position<T: AsRef<str>>(fen: Option<&str>, moves: &[T]) -> Result<Game> {
    let start = match fen {
        Some(fen) => parse_position(fen)?,
        None => Game::default(),
    };

    moves.iter().try_fold(start, |game, mv| {
        let mv = parse_move(&game, mv.as_ref())?;
        Ok(game.with_move_made(mv))
    })
}

/// Says whether the game in `game` is over, and if not, whose turn it is.
fn describe_status(game: &Game) -> String {
    let status = status(game);

    if status.is_terminal() {
        format!("game over: {status}")
    } else {
        format!("{status}, {} to move", color_name(game.side_to_move()))
    }
}

/// Parses one line of input, trying UCI first and engine commands second.
///
/// Returns `Ok(None)` for blank lines.
fn parse_input(line: &str) -> Result<Option<EngineCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    match UciCommand::new(line) {
        Ok(cmd) => Ok(Some(EngineCommand::Uci { cmd })),

        Err(UciParseError::UnrecognizedCommand { .. }) => {
            EngineCommand::try_parse_from(line.split_ascii_whitespace())
                .map(Some)
                .map_err(Into::into)
        }

        // A UCI command, but malformed
        Err(err) => Err(anyhow!("{err}")),
    }
}

/// Forwards every command read from `input` to `sender`, then sends `exit` once input closes.
fn read_input(input: impl BufRead, sender: &Sender<EngineCommand>) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read from stdin")?;

        match parse_input(&line) {
            Ok(Some(cmd)) => sender
                .send(cmd)
                .map_err(|_| anyhow!("The engine stopped receiving commands"))?,
            Ok(None) => {}
            Err(err) => eprintln!("{err}"),
        }
    }

    sender
        .send(EngineCommand::Exit { cleanup: false })
        .map_err(|_| anyhow!("The engine stopped receiving commands"))
}

/// Prints `info string <msg>`.
fn send_string<T: fmt::Display>(msg: T) {
    println!("{}", UciResponse::info_string(msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEN_BACK_RANK: &str = "6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1";

    #[test]
    fn test_position_applies_moves() {
        let game = position(None, &["e2e4", "e7e5", "g1f3"]).unwrap();

        assert_eq!(
            game.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn test_invalid_position_keeps_current_game() {
        let mut engine = Engine::new();
        engine
            .execute("position startpos moves d2d4".parse().unwrap())
            .unwrap();
        let before = engine.game.to_fen();

        engine
            .execute("position startpos moves e2e4 e2e4".parse().unwrap())
            .unwrap();
        assert_eq!(engine.game.to_fen(), before);

        assert!(position::<&str>(Some("not a fen"), &[]).is_err());
        assert!(position(None, &["e2e5"]).is_err());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(
            EngineOption::parse("Hash", Some("64")).unwrap(),
            EngineOption::Hash(64)
        );
        assert_eq!(
            EngineOption::parse("Clear Hash", None).unwrap(),
            EngineOption::ClearHash
        );
        assert_eq!(
            EngineOption::parse("Threads", Some("1")).unwrap(),
            EngineOption::Threads
        );

        assert!(EngineOption::parse("Hash", Some("0")).is_err());
        assert!(EngineOption::parse("Hash", Some("100000")).is_err());
        assert!(EngineOption::parse("Hash", Some("big")).is_err());
        assert!(EngineOption::parse("Hash", None).is_err());
        assert!(EngineOption::parse("Threads", Some("4")).is_err());
        assert!(EngineOption::parse("Contempt", Some("10")).is_err());
    }

    #[test]
    fn test_resize_hash() {
        let mut engine = Engine::new();
        let default_capacity = engine.ttable.capacity();

        engine.apply_option(EngineOption::Hash(2)).unwrap();
        assert!(engine.ttable.capacity() < default_capacity);
        assert!(engine.get_option("Hash").is_some());
        assert_eq!(engine.get_option("Threads").as_deref(), Some("1"));
        assert_eq!(engine.get_option("Ponder"), None);
    }

    #[test]
    fn test_parse_input() {
        assert!(matches!(parse_input("   "), Ok(None)));
        assert!(matches!(
            parse_input("isready\n"),
            Ok(Some(EngineCommand::Uci {
                cmd: UciCommand::IsReady
            }))
        ));
        assert!(matches!(
            parse_input("moves --ordered"),
            Ok(Some(EngineCommand::Moves { ordered: true }))
        ));
        assert!(parse_input("fly to the moon").is_err());
    }

    #[test]
    fn test_read_input_ends_with_exit() {
        let (sender, receiver) = mpsc::channel();
        let input = "uci\n\nstatus\n";

        read_input(input.as_bytes(), &sender).unwrap();
        let cmds = receiver.try_iter().collect::<Vec<_>>();

        assert_eq!(cmds.len(), 3);
        assert!(matches!(
            cmds[0],
            EngineCommand::Uci {
                cmd: UciCommand::Uci
            }
        ));
        assert!(matches!(cmds[1], EngineCommand::Status));
        assert!(matches!(cmds[2], EngineCommand::Exit { cleanup: false }));
    }

    #[test]
    fn test_quit_stops_event_loop() {
        let mut engine = Engine::new();

        let flow = engine.execute("quit".parse().unwrap()).unwrap();
        assert_eq!(flow, ControlFlow::Quit);

        let flow = engine.execute("exit".parse().unwrap()).unwrap();
        assert_eq!(flow, ControlFlow::Quit);

        let flow = engine.execute("isready".parse().unwrap()).unwrap();
        assert_eq!(flow, ControlFlow::Continue);
    }

    #[test]
    fn test_search_runs_on_worker_thread() {
        let mut engine = Engine::new();
        engine.game = parse_position(FEN_BACK_RANK).unwrap();

        let config = SearchConfig {
            max_depth: 2,
            ..Default::default()
        };
        engine.start_search::<LogNone>(engine.game, config);
        let res = engine.stop_search().unwrap();

        assert_eq!(
            res.bestmove.map(|mv| mv.to_string()).as_deref(),
            Some("a1a8")
        );
        assert!(!engine.is_searching.load(Ordering::Relaxed));
        assert!(engine.ttable.num_entries() > 0);
    }

    #[test]
    fn test_describe_status() {
        let game = parse_position(crate::board::FEN_STARTPOS).unwrap();
        assert_eq!(describe_status(&game), "ongoing, White to move");

        let mated = parse_position("R5k1/5ppp/8/8/8/8/8/4K3 b - - 1 1").unwrap();
        assert_eq!(describe_status(&mated), "game over: checkmate (White wins)");

        let drawn = parse_position("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            describe_status(&drawn),
            "game over: draw by insufficient material"
        );
    }

    #[test]
    fn test_moves_listing() {
        let mut engine = Engine::new();
        engine.game = parse_position("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1").unwrap();

        assert!(engine.moves(true).starts_with("e4d5, "));

        engine.game = parse_position("k7/8/KQ6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(engine.moves(false), "(none)");
    }
}
