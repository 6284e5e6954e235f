#![forbid(unsafe_code)]

//! Linear undo/redo history over immutable snapshots.
//!
//! # Invariants
//!
//! 1. After construction the past is never empty: the base snapshot can be
//!    replaced but not undone.
//! 2. The future is cleared on every [`commit`](SnapshotHistory::commit).
//! 3. [`current`](SnapshotHistory::current) is always the most recently
//!    committed or restored snapshot.
//! 4. Nothing is ever evicted, so the action flow and every store can always
//!    be rewound in lockstep.

use std::fmt;
use std::sync::Arc;

/// Snapshot-based undo/redo history.
pub struct SnapshotHistory<T> {
    /// Committed snapshots; the back is the current one.
    past: Vec<Arc<T>>,
    /// Undone snapshots; the back is the next to redo.
    future: Vec<Arc<T>>,
}

impl<T> fmt::Debug for SnapshotHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHistory")
            .field("past", &self.past.len())
            .field("future", &self.future.len())
            .finish()
    }
}

impl<T> SnapshotHistory<T> {
    /// Start a history from its base snapshot.
    #[must_use]
    pub fn new(base: T) -> Self {
        Self {
            past: vec![Arc::new(base)],
            future: Vec::new(),
        }
    }

    /// The snapshot currently in effect.
    #[must_use]
    pub fn current(&self) -> &Arc<T> {
        // Invariant 1: `past` is never empty.
        self.past
            .last()
            .unwrap_or_else(|| unreachable!("snapshot history lost its base"))
    }

    /// Commit a new snapshot. Discards anything that could have been redone.
    pub fn commit(&mut self, snapshot: T) {
        self.future.clear();
        self.past.push(Arc::new(snapshot));
    }

    /// Replace the current snapshot without recording history.
    ///
    /// Only meant for seeding a store before the first commit.
    pub fn replace_current(&mut self, snapshot: T) {
        self.past.pop();
        self.past.push(Arc::new(snapshot));
    }

    /// Step back one snapshot. Returns `(undone, restored)`.
    pub fn undo(&mut self) -> Option<(Arc<T>, Arc<T>)> {
        if self.past.len() < 2 {
            return None;
        }
        let undone = self.past.pop()?;
        self.future.push(Arc::clone(&undone));
        let restored = Arc::clone(self.current());
        Some((undone, restored))
    }

    /// Step forward one snapshot. Returns `(left, restored)`.
    pub fn redo(&mut self) -> Option<(Arc<T>, Arc<T>)> {
        let restored = self.future.pop()?;
        let left = Arc::clone(self.current());
        self.past.push(Arc::clone(&restored));
        Some((left, restored))
    }

    /// Drop every snapshot that could still be redone.
    pub fn discard_redo(&mut self) {
        self.future.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.past.len() >= 2
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len() - 1
    }

    /// Number of redo steps available.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }
}
