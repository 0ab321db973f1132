/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use chessie::Game;

use crate::{board::PositionKey, Score, SearchBounds};

/// Number of bytes in a megabyte
const BYTES_IN_MB: usize = 1024 * 1024;

/// Maximum number of independently-locked shards in a [`TTable`].
const MAX_SHARDS: usize = 16;

/// Identifies a node of the search tree: a position, the depth it was searched to, and
/// which side was maximizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchKey {
    /// Canonical identity of the position.
    pub position: PositionKey,

    /// Remaining depth when the node was searched.
    pub depth: u8,

    /// Whether the node was searched from the maximizing side's perspective.
    pub maximizing: bool,
}

impl SearchKey {
    /// Creates a new [`SearchKey`] for `game`.
    #[inline(always)]
    pub fn new(game: &Game, depth: u8, maximizing: bool) -> Self {
        Self {
            position: PositionKey::new(game),
            depth,
            maximizing,
        }
    }
}

/// How a cached score relates to the true value of its node.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum NodeType {
    /// Exact.
    Pv,

    /// Failed low, so the true value is at most the score.
    All,

    /// Failed high, so the true value is at least the score.
    Cut,
}

impl NodeType {
    /// Classifies `score` against the window its node was searched with.
    #[inline(always)]
    pub fn new(score: Score, bounds: SearchBounds) -> Self {
        if score <= bounds.alpha {
            Self::All
        } else if score >= bounds.beta {
            Self::Cut
        } else {
            Self::Pv
        }
    }
}

/// A cached node.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TTableEntry {
    pub key: SearchKey,

    /// White-relative, as returned by the node.
    pub score: Score,

    pub node_type: NodeType,
}

impl TTableEntry {
    /// `bounds` is the window the node was entered with.
    #[inline(always)]
    pub fn new(key: SearchKey, score: Score, bounds: SearchBounds) -> Self {
        Self {
            key,
            score,
            node_type: NodeType::new(score, bounds),
        }
    }

    /// Returns this entry's score only if it is usable within `bounds`.
    ///
    /// Exact scores are always usable. An upper bound is usable if it cannot exceed `alpha`,
    /// and a lower bound is usable if it is already at or above `beta`.
    #[inline(always)]
    pub fn try_score(&self, bounds: SearchBounds) -> Option<Score> {
        let usable = match self.node_type {
            NodeType::Pv => true,
            NodeType::All => self.score <= bounds.alpha,
            NodeType::Cut => self.score >= bounds.beta,
        };

        usable.then_some(self.score)
    }
}

/// Snapshot of how a [`TTable`] has been used since it was last cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TTableStats {
    pub accesses: usize,
    pub hits: usize,
    pub collisions: usize,
}

impl TTableStats {
    /// Percentage of accesses that produced a usable score.
    #[inline(always)]
    pub fn hit_rate(&self) -> f32 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f32 / self.accesses as f32 * 100.0
        }
    }
}

/// Fixed-size cache of node scores, safe to share between threads.
///
/// Slots live in separately locked shards. Storing into an occupied slot replaces it.
#[derive(Debug)]
pub struct TTable {
    shards: Box<[Mutex<Vec<Option<TTableEntry>>>]>,

    per_shard: usize,

    // Reset by `clear`
    collisions: AtomicUsize,
    accesses: AtomicUsize,
    hits: AtomicUsize,
}

impl TTable {
    /// Sizes accepted by the `Hash` option, in megabytes.
    pub const DEFAULT_SIZE: usize = 16;
    pub const MIN_SIZE: usize = 1;
    pub const MAX_SIZE: usize = 1_024;

    /// A table of about `size` megabytes.
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        Self::from_capacity(size * BYTES_IN_MB / mem::size_of::<Option<TTableEntry>>())
    }

    /// A table of at least `capacity` slots.
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let num_shards = capacity.clamp(1, MAX_SHARDS);
        let per_shard = capacity.div_ceil(num_shards);

        let shards = (0..num_shards)
            .map(|_| Mutex::new(vec![None; per_shard]))
            .collect();

        Self {
            shards,
            per_shard,
            collisions: AtomicUsize::new(0),
            accesses: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// Empties every slot and resets the counters.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            lock(shard).iter_mut().for_each(|entry| *entry = None);
        }

        self.collisions.store(0, Ordering::Relaxed);
        self.accesses.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
    }

    /// Total number of slots.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.shards.len() * self.per_shard
    }

    /// Approximate size in megabytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.capacity() * mem::size_of::<Option<TTableEntry>>() / BYTES_IN_MB
    }

    /// Number of occupied slots.
    pub fn num_entries(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| lock(shard).iter().filter(|entry| entry.is_some()).count())
            .sum()
    }

    /// Returns the usage statistics of this [`TTable`].
    pub fn stats(&self) -> TTableStats {
        TTableStats {
            accesses: self.accesses.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
        }
    }

    /// Map `key` to a shard and a slot within that shard.
    #[inline(always)]
    fn index(&self, key: &SearchKey) -> (usize, usize) {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish() as usize;

        let shard = hash % self.shards.len();
        let slot = (hash / self.shards.len()) % self.per_shard;

        (shard, slot)
    }

    /// Get the entry if and only if it matches the provided key
    pub fn get(&self, key: &SearchKey) -> Option<TTableEntry> {
        let (shard, slot) = self.index(key);

        lock(&self.shards[shard])[slot].filter(|entry| &entry.key == key)
    }

    /// Fetches the score stored for `key`, if there is one and it is usable within `bounds`.
    pub fn probe(&self, key: &SearchKey, bounds: SearchBounds) -> Option<Score> {
        self.accesses.fetch_add(1, Ordering::Relaxed);

        let score = self.get(key)?.try_score(bounds)?;
        self.hits.fetch_add(1, Ordering::Relaxed);

        Some(score)
    }

    /// Store `entry` in the table at `entry.key`, overriding and returning whatever was there.
    pub fn store(&self, entry: TTableEntry) -> Option<TTableEntry> {
        let (shard, slot) = self.index(&entry.key);
        let key = entry.key;

        let old = lock(&self.shards[shard])[slot].replace(entry);

        if old.as_ref().is_some_and(|old| old.key != key) {
            self.collisions.fetch_add(1, Ordering::Relaxed);
        }

        old
    }
}

impl Default for TTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

/// Locks a shard, recovering its contents if another thread panicked while holding it.
#[inline(always)]
fn lock<T>(shard: &Mutex<T>) -> MutexGuard<'_, T> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{parse_position, FEN_STARTPOS};

    fn key(fen: &str, depth: u8) -> SearchKey {
        SearchKey::new(&parse_position(fen).unwrap(), depth, true)
    }

    fn exact(key: SearchKey, score: i32) -> TTableEntry {
        TTableEntry::new(key, Score::new(score), SearchBounds::default())
    }

    #[test]
    fn test_single_slot_replacement() {
        let key1 = key(FEN_STARTPOS, 3);
        let key2 = key("4k3/8/8/8/8/8/8/4K2R w K - 0 1", 3);

        let entry1 = exact(key1, 0);
        let entry2 = exact(key2, 500);

        // A single slot forces both entries onto the same index
        let tt = TTable::from_capacity(1);
        assert_eq!(tt.capacity(), 1);
        assert_eq!(tt.num_entries(), 0);

        tt.store(entry1);
        assert_eq!(tt.num_entries(), 1);
        assert_eq!(tt.get(&key1), Some(entry1));

        let evicted = tt.store(entry2);
        assert_eq!(evicted, Some(entry1));
        assert_eq!(tt.num_entries(), 1, "the second store replaces the first");
        assert_eq!(tt.stats().collisions, 1);

        assert!(tt.get(&key1).is_none(), "replaced entries are gone");
        assert_eq!(tt.get(&key2), Some(entry2));
    }

    #[test]
    fn test_key_includes_depth_and_side() {
        let tt = TTable::from_capacity(1024);
        tt.store(exact(key(FEN_STARTPOS, 3), 42));

        assert!(tt.get(&key(FEN_STARTPOS, 3)).is_some());
        assert!(tt.get(&key(FEN_STARTPOS, 2)).is_none());

        let game = parse_position(FEN_STARTPOS).unwrap();
        assert!(tt.get(&SearchKey::new(&game, 3, false)).is_none());
    }

    #[test]
    fn test_bounds_are_honored() {
        let window = SearchBounds::new(Score::new(-50), Score::new(50));

        // Failed high: a lower bound of 100
        let lower = TTableEntry::new(key(FEN_STARTPOS, 2), Score::new(100), window);
        assert_eq!(lower.node_type, NodeType::Cut);
        assert_eq!(lower.try_score(window), Some(Score::new(100)));
        assert_eq!(
            lower.try_score(SearchBounds::new(Score::new(-50), Score::new(200))),
            None,
            "A lower bound below beta says nothing about the true score"
        );

        // Failed low: an upper bound of -100
        let upper = TTableEntry::new(key(FEN_STARTPOS, 2), Score::new(-100), window);
        assert_eq!(upper.node_type, NodeType::All);
        assert_eq!(upper.try_score(window), Some(Score::new(-100)));
        assert_eq!(
            upper.try_score(SearchBounds::new(Score::new(-200), Score::new(50))),
            None
        );

        // Inside the window: exact
        let pv = TTableEntry::new(key(FEN_STARTPOS, 2), Score::new(10), window);
        assert_eq!(pv.node_type, NodeType::Pv);
        assert_eq!(pv.try_score(SearchBounds::default()), Some(Score::new(10)));
    }

    #[test]
    fn test_probe_counts_hits() {
        let tt = TTable::from_capacity(64);
        let k = key(FEN_STARTPOS, 1);

        assert_eq!(tt.probe(&k, SearchBounds::default()), None);
        tt.store(exact(k, 7));
        assert_eq!(tt.probe(&k, SearchBounds::default()), Some(Score::new(7)));

        let stats = tt.stats();
        assert_eq!(stats.accesses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_clear() {
        let tt = TTable::from_capacity(64);
        tt.store(exact(key(FEN_STARTPOS, 1), 7));
        tt.probe(&key(FEN_STARTPOS, 1), SearchBounds::default());

        tt.clear();
        assert_eq!(tt.num_entries(), 0);
        assert_eq!(tt.stats(), TTableStats::default());
    }

    #[test]
    fn test_sizing() {
        assert!(TTable::new(TTable::MIN_SIZE).capacity() > MAX_SHARDS);
        assert_eq!(TTable::from_capacity(100).capacity(), 112);
        assert_eq!(TTable::from_capacity(3).capacity(), 3);
    }
}
