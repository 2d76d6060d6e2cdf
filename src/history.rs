//! Time-travel cursor over a thread's checkpoint history.
//!
//! The cursor owns a snapshot of the list taken at construction; it never
//! re-reads the backend, so writes by other callers stay invisible until a
//! new cursor is built. Holding a live cursor against the backend would
//! force read locks or long transactions.

use crate::checkpoint::{Checkpoint, StateValue};
use crate::savers::{Saver, SaverResult};

/// Cursor over an ascending-timestamp snapshot, starting at the latest
/// checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointHistory<S> {
    entries: Vec<Checkpoint<S>>,
    cursor: Option<usize>,
}

impl<S: StateValue> CheckpointHistory<S> {
    /// Build a cursor over a list sorted by timestamp ascending, as returned
    /// by [`Saver::list`]. The initial position is the latest entry.
    pub fn from_list(entries: Vec<Checkpoint<S>>) -> Self {
        let cursor = entries.len().checked_sub(1);
        Self { entries, cursor }
    }

    /// Snapshot `thread_id`'s history straight from a saver.
    pub async fn capture(saver: &dyn Saver<S>, thread_id: &str) -> SaverResult<Self> {
        Ok(Self::from_list(saver.list(thread_id).await?))
    }

    /// The checkpoint under the cursor; `None` only for an empty history.
    pub fn current(&self) -> Option<&Checkpoint<S>> {
        self.cursor.map(|i| &self.entries[i])
    }

    /// Step toward more recent. Returns `false` (cursor unchanged) past the
    /// end.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        match self.cursor {
            Some(i) if i + 1 < self.entries.len() => {
                self.cursor = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Step toward older. Returns `false` (cursor unchanged) past the
    /// beginning.
    pub fn prev(&mut self) -> bool {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero-based position of the cursor within the snapshot, oldest first.
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }
}
