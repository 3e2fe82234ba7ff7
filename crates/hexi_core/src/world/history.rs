//! Bounded history of world generations.
//!
//! Each entry owns a full copy of the grid at one generation boundary plus
//! the log of the step that produced it; entry 0 is the initial state.
//! Snapshots never share storage with the live grid, so restoring an entry
//! is a plain clone. The ring is bounded: overflow evicts the oldest entry
//! while absolute indices keep counting.

use crate::hexidirect::HexGrid;
use std::collections::VecDeque;

/// Default number of generations kept per world.
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// One recorded generation.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Absolute generation index, stable across eviction
    pub index: usize,
    pub grid: HexGrid,
    pub log: Vec<String>,
}

impl HistoryEntry {
    pub fn active_count(&self) -> usize {
        self.grid.active_count()
    }
}

/// Bounded ring of generations with a cursor for prev/next/go.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    /// Position of the cursor within `entries`
    cursor: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The absolute index under the cursor.
    pub fn cursor_index(&self) -> Option<usize> {
        self.entries.get(self.cursor).map(|e| e.index)
    }

    /// Append a generation. Entries ahead of the cursor are discarded
    /// first (stepping from a rewound world rewrites the future), then the
    /// ring evicts its oldest entry if full. Returns the absolute index.
    pub fn push(&mut self, grid: HexGrid, log: Vec<String>) -> usize {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        let index = match self.entries.back() {
            Some(last) => last.index + 1,
            None => 0,
        };
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { index, grid, log });
        self.cursor = self.entries.len() - 1;
        index
    }

    /// Look up an entry by absolute index.
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        let first = self.entries.front()?.index;
        let offset = index.checked_sub(first)?;
        self.entries.get(offset)
    }

    /// Move the cursor to an absolute index.
    pub fn go(&mut self, index: usize) -> Option<&HistoryEntry> {
        let first = self.entries.front()?.index;
        let offset = index.checked_sub(first)?;
        if offset >= self.entries.len() {
            return None;
        }
        self.cursor = offset;
        self.entries.get(self.cursor)
    }

    /// Move the cursor one entry back.
    pub fn prev(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Move the cursor one entry forward.
    pub fn next(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }
}
