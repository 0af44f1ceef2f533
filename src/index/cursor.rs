//! Streaming cursors over sorted indexes
//!
//! The `IndexStream` contract is what the merge-join executor consumes: a
//! cursor positioned on whole duplicate-key groups that advances
//! monotonically and never rewinds. The in-memory implementation here never
//! blocks; a disk- or network-backed implementation may fail any call,
//! which is why every method returns a result.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::IndexResult;
use super::key::SortKey;
use super::sorted::{IndexEntry, SortedIndex};

/// Iteration direction of a sorted cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending key order
    Forward,
    /// Descending key order
    Reverse,
}

impl SortDirection {
    /// Compares two keys in iteration order: `Less` means `a` is reached
    /// before `b` by a cursor moving in this direction.
    pub fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering {
        match self {
            SortDirection::Forward => a.cmp(b),
            SortDirection::Reverse => b.cmp(a),
        }
    }
}

/// Pull contract for one participant's sorted index stream.
///
/// The cursor is always positioned at the start of a duplicate-key group
/// (or exhausted). `read_group` buffers the current group without moving;
/// `advance_past_key` consumes it.
pub trait IndexStream: Send {
    /// Key of the current group, or None when exhausted
    fn peek_key(&mut self) -> IndexResult<Option<SortKey>>;

    /// Buffers all entries of the current duplicate-key group, in iteration
    /// order. Empty when exhausted. Does not move the cursor.
    fn read_group(&mut self) -> IndexResult<Vec<IndexEntry>>;

    /// Moves past every entry of the current group. No-op when exhausted.
    fn advance_past_key(&mut self) -> IndexResult<()>;

    /// Whether the cursor has run off its range
    fn is_exhausted(&self) -> bool;
}

/// Cursor over an in-memory `SortedIndex`, restricted to a half-open entry
/// window resolved from the key range at open time.
#[derive(Debug)]
pub struct SortedIndexCursor {
    index: Arc<SortedIndex>,
    direction: SortDirection,
    /// Window start (inclusive, ascending entry order)
    lo: usize,
    /// Window end (exclusive, ascending entry order)
    hi: usize,
    /// Forward: next entry index. Reverse: one past the current entry.
    pos: usize,
}

impl SortedIndexCursor {
    pub(crate) fn new(
        index: Arc<SortedIndex>,
        direction: SortDirection,
        lo: usize,
        hi: usize,
    ) -> Self {
        let pos = match direction {
            SortDirection::Forward => lo,
            SortDirection::Reverse => hi,
        };
        Self {
            index,
            direction,
            lo,
            hi,
            pos,
        }
    }

    /// Current entry, if any
    fn current(&self) -> Option<&IndexEntry> {
        match self.direction {
            SortDirection::Forward if self.pos < self.hi => Some(&self.index.entries()[self.pos]),
            SortDirection::Reverse if self.pos > self.lo => {
                Some(&self.index.entries()[self.pos - 1])
            }
            _ => None,
        }
    }

    /// Entry index range of the current duplicate-key group, ascending
    fn group_bounds(&self) -> Option<(usize, usize)> {
        let entries = self.index.entries();
        let current = self.current()?;
        match self.direction {
            SortDirection::Forward => {
                let mut end = self.pos + 1;
                while end < self.hi && entries[end].key == current.key {
                    end += 1;
                }
                Some((self.pos, end))
            }
            SortDirection::Reverse => {
                let mut start = self.pos - 1;
                while start > self.lo && entries[start - 1].key == current.key {
                    start -= 1;
                }
                Some((start, self.pos))
            }
        }
    }
}

impl IndexStream for SortedIndexCursor {
    fn peek_key(&mut self) -> IndexResult<Option<SortKey>> {
        Ok(self.current().map(|e| e.key.clone()))
    }

    fn read_group(&mut self) -> IndexResult<Vec<IndexEntry>> {
        let Some((start, end)) = self.group_bounds() else {
            return Ok(Vec::new());
        };
        let entries = &self.index.entries()[start..end];
        let group: Vec<IndexEntry> = match self.direction {
            SortDirection::Forward => entries.to_vec(),
            SortDirection::Reverse => entries.iter().rev().cloned().collect(),
        };
        Ok(group)
    }

    fn advance_past_key(&mut self) -> IndexResult<()> {
        if let Some((start, end)) = self.group_bounds() {
            self.pos = match self.direction {
                SortDirection::Forward => end,
                SortDirection::Reverse => start,
            };
        }
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }
}
