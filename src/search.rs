/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{bail, Result};
use chessie::{Color, Game, Move};
use uci_parser::{UciInfo, UciResponse, UciSearchOptions};

use crate::{
    board::{legal_moves, validate},
    captures, evaluate, order_moves, tune, LogLevel, LogNone, Score, SearchKey, TTable,
    TTableEntry,
};

/// Maximum depth that can be searched
pub const MAX_DEPTH: u8 = u8::MAX;

/// Searches `game` to a fixed `depth` and returns the best move for the side to move.
///
/// Uses `ttable` as its cache, so results from earlier calls sharing the same table are reused.
/// Returns `Ok(None)` only if the position has no legal moves.
/// Fails if `game` is not a valid position, before any searching is done.
pub fn find_best_move(game: &Game, depth: u8, ttable: &TTable) -> Result<Option<Move>> {
    validate(game)?;

    let is_searching = Arc::new(AtomicBool::new(true));
    let mut search = Search::<LogNone>::new(is_searching, SearchConfig::default(), ttable);

    Ok(search.find_best_move(game, depth)?.bestmove)
}

/// Resolves the captures available in `game` and returns the score of the quiet position
/// they lead to, within the window `(alpha, beta)`.
///
/// `maximizing` is `true` if the side to move is trying to raise the score (White).
pub fn quiescence(game: &Game, alpha: Score, beta: Score, maximizing: bool) -> Score {
    let ttable = TTable::from_capacity(1);
    let is_searching = Arc::new(AtomicBool::new(true));
    let mut search = Search::<LogNone>::new(is_searching, SearchConfig::default(), &ttable);

    search.quiescence(game, SearchBounds::new(alpha, beta), maximizing)
}

/// The `(alpha, beta)` window of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    /// Best score White can already force elsewhere in the tree.
    pub alpha: Score,

    /// Best score Black can already force elsewhere in the tree.
    pub beta: Score,
}

impl SearchBounds {
    #[inline(always)]
    pub const fn new(alpha: Score, beta: Score) -> Self {
        Self { alpha, beta }
    }

    /// Raises `alpha` (if maximizing) or lowers `beta` (if minimizing) towards `score`.
    #[inline(always)]
    fn tighten(&mut self, score: Score, maximizing: bool) {
        if maximizing {
            self.alpha = self.alpha.max(score);
        } else {
            self.beta = self.beta.min(score);
        }
    }

    /// Returns `true` if the window has closed, so no remaining move can change the result.
    #[inline(always)]
    const fn is_closed(&self) -> bool {
        self.alpha.0 >= self.beta.0
    }
}

impl Default for SearchBounds {
    /// The full window.
    #[inline(always)]
    fn default() -> Self {
        Self::new(-Score::INF, Score::INF)
    }
}

/// What a search produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchResult {
    pub nodes: u64,

    /// `None` only if the root had no legal moves.
    pub bestmove: Option<Move>,

    /// White-relative score of `bestmove`.
    pub score: Score,

    /// Deepest iteration that finished.
    pub depth: u8,
}

impl Default for SearchResult {
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: Score::DRAW,
            depth: 0,
        }
    }
}

/// Limits on a [`Search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub max_depth: u8,

    /// Searching stops once this many nodes have been visited.
    pub max_nodes: u64,

    pub starttime: Instant,

    /// No new iteration is started once this much time has passed.
    pub soft_timeout: Duration,

    /// The running iteration is abandoned once this much time has passed.
    pub hard_timeout: Duration,
}

impl SearchConfig {
    /// Derives limits from the arguments of `go`.
    ///
    /// Clock time is read for the side to move in `game`.
    pub fn new(options: UciSearchOptions, game: &Game) -> Self {
        let mut config = Self::default();

        if let Some(depth) = options.depth {
            config.max_depth = u8::try_from(depth).unwrap_or(MAX_DEPTH);
        }

        if let Some(nodes) = options.nodes {
            config.max_nodes = nodes as u64;
        }

        // A fixed move time overrides the clock
        if let Some(movetime) = options.movetime {
            config.hard_timeout = movetime;
            config.soft_timeout = movetime;
        } else {
            let (time, inc) = match game.side_to_move() {
                Color::White => (options.wtime, options.winc),
                Color::Black => (options.btime, options.binc),
            };

            if let Some(time) = time {
                let inc = inc.unwrap_or(Duration::ZERO) / tune::time_inc_divisor!();

                config.soft_timeout = time / tune::soft_timeout_divisor!() + inc;
                config.hard_timeout = time / tune::hard_timeout_divisor!() + inc;
            }
        }

        config
    }
}

impl Default for SearchConfig {
    /// No limits beyond [`MAX_DEPTH`].
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: u64::MAX,
            starttime: Instant::now(),
            soft_timeout: Duration::MAX,
            hard_timeout: Duration::MAX,
        }
    }
}

/// Executes a minimax search on a game of chess.
///
/// White is always the maximizing side and Black the minimizing side, so every score
/// produced here is from White's perspective.
pub struct Search<'a, Log> {
    nodes: u64,

    /// Cleared by the engine on `stop`.
    is_searching: Arc<AtomicBool>,

    config: SearchConfig,

    ttable: &'a TTable,

    log: PhantomData<&'a Log>,
}

impl<'a, Log: LogLevel> Search<'a, Log> {
    #[inline(always)]
    pub fn new(is_searching: Arc<AtomicBool>, config: SearchConfig, ttable: &'a TTable) -> Self {
        Self {
            nodes: 0,
            is_searching,
            config,
            ttable,
            log: PhantomData,
        }
    }

    /// Runs iterative deepening on `game` and reports `bestmove`.
    ///
    /// Clears `is_searching` when done.
    pub fn start(mut self, game: &Game) -> SearchResult {
        if Log::DEBUG {
            self.send_string(format!("searching {}", game.to_fen()));

            let soft = self.config.soft_timeout.as_millis();
            let hard = self.config.hard_timeout.as_millis();
            let nodes = self.config.max_nodes;
            let depth = self.config.max_depth;

            if soft < Duration::MAX.as_millis() {
                self.send_string(format!("soft limit {soft}ms"));
            }
            if hard < Duration::MAX.as_millis() {
                self.send_string(format!("hard limit {hard}ms"));
            }
            if nodes < u64::MAX {
                self.send_string(format!("node limit {nodes}"));
            }
            if depth < MAX_DEPTH {
                self.send_string(format!("depth limit {depth}"));
            }
        }

        let res = self.iterative_deepening(game);

        if Log::DEBUG {
            let stats = self.ttable.stats();
            self.send_string(format!(
                "TT stats: {} hits / {} accesses ({:.2}% hit rate), {} collisions",
                stats.hits,
                stats.accesses,
                stats.hit_rate(),
                stats.collisions
            ));
        }

        if Log::INFO {
            self.send_response(UciResponse::BestMove {
                bestmove: res.bestmove.map(|mv| mv.to_string()),
                ponder: None,
            });
        }

        self.is_searching.store(false, Ordering::Relaxed);

        res
    }

    #[inline(always)]
    fn send_response<T: fmt::Display>(&self, response: UciResponse<T>) {
        println!("{response}");
    }

    #[inline(always)]
    fn send_info(&self, info: UciInfo) {
        let resp = UciResponse::info(info);
        self.send_response(resp);
    }

    /// Prints `info string ...`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(&self, string: T) {
        self.send_response(UciResponse::info_string(string));
    }

    /// Searches to depth 1, 2, 3... until a limit is hit.
    ///
    /// A cancelled iteration is discarded in favour of the last finished one.
    fn iterative_deepening(&mut self, game: &Game) -> SearchResult {
        // Until the first iteration completes, fall back to the first move in search order
        let mut moves = legal_moves(game);
        order_moves(game, &mut moves);

        let mut result = SearchResult {
            bestmove: moves.first().copied(),
            score: evaluate(game),
            ..Default::default()
        };

        // Nothing to search in a terminal position
        if moves.is_empty() {
            return result;
        }

        for depth in 1..=self.config.max_depth {
            if self.config.starttime.elapsed() >= self.config.soft_timeout
                || !self.is_searching.load(Ordering::Relaxed)
            {
                break;
            }

            match self.find_best_move(game, depth) {
                Ok(res) => result = res,

                Err(e) => {
                    if Log::DEBUG {
                        self.send_string(format!(
                            "depth {depth} abandoned ({e}), keeping depth {}",
                            result.depth
                        ));
                    }

                    break;
                }
            }

            if Log::INFO {
                self.send_end_of_search_info(&result);
            }
        }

        result.nodes = self.nodes;
        result
    }

    /// Reports a finished iteration.
    #[inline(always)]
    fn send_end_of_search_info(&self, result: &SearchResult) {
        let elapsed = self.config.starttime.elapsed();

        let mut info = UciInfo::new()
            .depth(result.depth)
            .nodes(self.nodes)
            .score(result.score.into_uci(result.depth))
            .nps((self.nodes as f32 / elapsed.as_secs_f32()).trunc())
            .time(elapsed.as_millis());

        if let Some(bestmove) = result.bestmove {
            info = info.pv([bestmove.to_string()]);
        }

        self.send_info(info);
    }

    /// Searches every root move of `game` to `depth` and returns the best one for the side to move.
    ///
    /// White picks the move with the highest score and Black the lowest.
    /// On a tie, the move searched first is kept.
    pub fn find_best_move(&mut self, game: &Game, depth: u8) -> Result<SearchResult> {
        let maximizing = game.side_to_move() == Color::White;

        // Captures first is a cheap ordering for the root, too
        let mut moves = legal_moves(game);
        order_moves(game, &mut moves);

        let mut bounds = SearchBounds::default();
        let mut best: Option<(Move, Score)> = None;

        for mv in moves {
            self.check_limits()?;

            // Copy-make the new position
            let child = game.with_move_made(mv);
            let score = self.alpha_beta(&child, depth.saturating_sub(1), bounds, !maximizing)?;

            let improves = best.map_or(true, |(_, best)| {
                if maximizing {
                    score > best
                } else {
                    score < best
                }
            });

            if improves {
                best = Some((mv, score));
                bounds.tighten(score, maximizing);
            }
        }

        Ok(SearchResult {
            nodes: self.nodes,
            bestmove: best.map(|(mv, _)| mv),
            score: best.map_or_else(|| evaluate(game), |(_, score)| score),
            depth,
        })
    }

    /// Fail-soft minimax with alpha-beta pruning.
    ///
    /// An `Err` means the search hit a limit; the unfinished node is not cached.
    fn alpha_beta(
        &mut self,
        game: &Game,
        depth: u8,
        bounds: SearchBounds,
        maximizing: bool,
    ) -> Result<Score> {
        self.nodes += 1;

        // A cached score usable in this window ends the node
        let key = SearchKey::new(game, depth, maximizing);
        if let Some(score) = self.ttable.probe(&key, bounds) {
            return Ok(score);
        }

        // Leaf node: resolve captures before trusting the static evaluation
        if depth == 0 {
            let score = self.quiescence(game, bounds, maximizing);
            self.ttable.store(TTableEntry::new(key, score, bounds));
            return Ok(score);
        }

        let mut moves = legal_moves(game);

        // Checkmate or stalemate. Mates found with more depth remaining are closer to the root.
        if moves.is_empty() {
            return Ok(evaluate(game).prefer_sooner(depth));
        }

        order_moves(game, &mut moves);

        let original_bounds = bounds;
        let mut bounds = bounds;
        let mut best = if maximizing { -Score::INF } else { Score::INF };

        for mv in moves {
            self.check_limits()?;

            let child = game.with_move_made(mv);
            let score = self.alpha_beta(&child, depth - 1, bounds, !maximizing)?;

            best = if maximizing {
                best.max(score)
            } else {
                best.min(score)
            };
            bounds.tighten(score, maximizing);

            if bounds.is_closed() {
                break;
            }
        }

        self.ttable
            .store(TTableEntry::new(key, best, original_bounds));

        Ok(best)
    }

    /// Capture-only search, run until the position is quiet.
    ///
    /// The side to move may decline every capture, so the static evaluation is a floor
    /// (or ceiling, for Black). Fails hard.
    fn quiescence(&mut self, game: &Game, mut bounds: SearchBounds, maximizing: bool) -> Score {
        self.nodes += 1;

        let stand_pat = evaluate(game);

        // The opponent already has a better line elsewhere
        if maximizing && stand_pat >= bounds.beta {
            return bounds.beta;
        } else if !maximizing && stand_pat <= bounds.alpha {
            return bounds.alpha;
        }
        bounds.tighten(stand_pat, maximizing);

        for mv in captures(game) {
            let child = game.with_move_made(mv);
            let score = self.quiescence(&child, bounds, !maximizing);

            bounds.tighten(score, maximizing);

            if bounds.is_closed() {
                break;
            }
        }

        if maximizing {
            bounds.alpha
        } else {
            bounds.beta
        }
    }

    /// Returns an error if the search must stop before looking at another move.
    #[inline(always)]
    fn check_limits(&self) -> Result<()> {
        if self.config.starttime.elapsed() >= self.config.hard_timeout {
            let ms = self.config.hard_timeout.as_millis();
            bail!("out of time after {ms}ms");
        }

        // `stop`, `quit` or a new search
        if !self.is_searching.load(Ordering::Relaxed) {
            bail!("stopped");
        }

        if self.nodes >= self.config.max_nodes {
            let nodes = self.config.max_nodes;
            bail!("reached the limit of {nodes} nodes");
        }

        Ok(())
    }
}
