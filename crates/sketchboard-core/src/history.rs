//! Bounded linear undo/redo history of encoded snapshots.

use crate::codec::Snapshot;
use std::collections::VecDeque;

/// Default number of snapshots kept.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Ordered snapshots with a cursor.
///
/// Invariants: `index < len()` whenever the history is non-empty, `can_undo()` iff
/// `index > 0`, `can_redo()` iff `index < len() - 1`, and `len() <= max_length()`.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    index: usize,
    max_length: usize,
}

impl History {
    /// Create an empty history. `max_length` must be at least 1.
    pub fn new(max_length: usize) -> Option<Self> {
        if max_length == 0 {
            return None;
        }
        Some(Self {
            entries: VecDeque::with_capacity(max_length.min(DEFAULT_MAX_HISTORY)),
            index: 0,
            max_length,
        })
    }

    /// Append a snapshot after the cursor.
    ///
    /// Any redo branch is discarded first. When the cap is exceeded the oldest
    /// entries are evicted; the cursor always ends on the new snapshot.
    pub fn push(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.max_length {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.index)
    }

    /// Snapshot an undo would restore, without moving the cursor.
    pub fn peek_previous(&self) -> Option<&Snapshot> {
        if self.can_undo() {
            self.entries.get(self.index - 1)
        } else {
            None
        }
    }

    /// Snapshot a redo would restore, without moving the cursor.
    pub fn peek_next(&self) -> Option<&Snapshot> {
        if self.can_redo() {
            self.entries.get(self.index + 1)
        } else {
            None
        }
    }

    /// Move the cursor back one entry. Returns the new current snapshot.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Move the cursor forward one entry. Returns the new current snapshot.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}
