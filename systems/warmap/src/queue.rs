//! FIFO work queue shared by every relaxation pass.

use std::collections::VecDeque;

use tracing::warn;
use warmap_core::TilePos;

/// Queue length the relaxation historically fit into.
pub const DEFAULT_QUEUE_CAPACITY_HINT: usize = 10_000;

/// Counters describing a single relaxation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelaxationStats {
    /// Tiles pushed onto the queue.
    pub pushes: u64,
    /// Tiles popped from the queue.
    pub pops: u64,
    /// Largest number of outstanding entries observed.
    pub peak_queue_len: usize,
    /// Times the outstanding entries rose above the capacity hint.
    pub overflow_warnings: u32,
}

/// Growable FIFO queue of tiles awaiting relaxation.
///
/// Tiles may be pushed several times; entries are never deduplicated, so the
/// pass ends exactly when pops catch up with pushes.
#[derive(Clone, Debug)]
pub struct RelaxationQueue {
    entries: VecDeque<TilePos>,
    capacity_hint: usize,
    above_hint: bool,
    stats: RelaxationStats,
}

impl RelaxationQueue {
    /// Creates an empty queue that warns once its length exceeds `capacity_hint`.
    #[must_use]
    pub fn with_capacity_hint(capacity_hint: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity_hint,
            above_hint: false,
            stats: RelaxationStats::default(),
        }
    }

    /// Empties the queue and clears its counters.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.above_hint = false;
        self.stats = RelaxationStats::default();
    }

    /// Appends a tile to the back of the queue.
    pub fn push(&mut self, pos: TilePos) {
        self.entries.push_back(pos);
        self.stats.pushes += 1;

        let len = self.entries.len();
        self.stats.peak_queue_len = self.stats.peak_queue_len.max(len);
        if len > self.capacity_hint && !self.above_hint {
            self.above_hint = true;
            self.stats.overflow_warnings += 1;
            warn!(
                outstanding = len,
                capacity_hint = self.capacity_hint,
                "relaxation queue exceeded its historical capacity"
            );
        }
    }

    /// Removes the tile at the front of the queue.
    pub fn pop(&mut self) -> Option<TilePos> {
        let pos = self.entries.pop_front()?;
        self.stats.pops += 1;
        if self.entries.len() <= self.capacity_hint {
            self.above_hint = false;
        }
        Some(pos)
    }

    /// Reports whether no tile awaits relaxation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters accumulated since the last reset.
    #[must_use]
    pub fn stats(&self) -> RelaxationStats {
        self.stats
    }
}

impl Default for RelaxationQueue {
    fn default() -> Self {
        Self::with_capacity_hint(DEFAULT_QUEUE_CAPACITY_HINT)
    }
}
