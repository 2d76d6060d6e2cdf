//! Checkpoint identifier generation.
//!
//! IDs combine a process-wide monotonic counter with a random UUID so that
//! IDs sort roughly in creation order within one process while staying
//! practically unique across processes. The counter restarts with the
//! process; a collision across restarts lands on an existing row and the
//! savers treat that as an upsert.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Generator handing out opaque checkpoint IDs.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Next opaque checkpoint ID, e.g. `cp-00000007-9f2c...`.
    pub fn next_checkpoint_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("cp-{seq:08}-{}", Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids = IdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.next_checkpoint_id()).collect();
        assert_eq!(generated.len(), 1000);
    }

    #[test]
    fn counter_prefix_is_monotonic() {
        let ids = IdGenerator::new();
        let first = ids.next_checkpoint_id();
        let second = ids.next_checkpoint_id();
        assert!(first.starts_with("cp-00000000-"));
        assert!(second.starts_with("cp-00000001-"));
    }
}
