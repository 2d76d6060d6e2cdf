//! Checkpoint, blob, and pending-write records.
//!
//! These are the rows the savers persist. A [`Checkpoint`] is the primary
//! record: one snapshot of a thread's typed state plus identity, lineage, and
//! metadata. [`ChannelBlob`] holds large per-channel payloads out-of-band,
//! and [`PendingWrite`] is the append-only log of channel writes a task had
//! staged against a checkpoint when it was interrupted.
//!
//! Checkpoints are immutable by convention: savers replace whole rows by
//! primary key and never patch fields in place.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::CheckpointConfig;

/// Bound alias for state payloads a checkpoint can carry.
///
/// Anything serde can round-trip qualifies; the savers never look inside the
/// state beyond encoding it to bytes and back.
pub trait StateValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StateValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Dynamic string-keyed metadata attached to checkpoints and writes.
pub type MetadataMap = FxHashMap<String, Value>;

/// Metadata key carrying how a checkpoint was produced.
pub const META_SOURCE: &str = "source";
/// Metadata key carrying the workflow step counter.
pub const META_STEP: &str = "step";
/// Metadata key carrying the node that produced the snapshot.
pub const META_NODE_NAME: &str = "node_name";
/// Metadata key carrying a caller-supplied description.
pub const META_DESCRIPTION: &str = "description";

/// `source` value for checkpoints written explicitly by a caller.
pub const SOURCE_MANUAL: &str = "manual";
/// `source` value for checkpoints written by the manager's auto-save path.
pub const SOURCE_AUTO: &str = "auto";

/// A snapshot of a thread's state at a point in time.
///
/// Identity is the triple `(thread_id, checkpoint_ns, id)`; re-saving the
/// same triple replaces the stored row. `parent_id` links back to the
/// checkpoint this one descends from, forming the execution tree a runtime
/// walks when branching or rewinding. The layer stores that lineage verbatim
/// and never interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<S> {
    /// Opaque unique identifier within `(thread_id, checkpoint_ns)`.
    pub id: String,
    /// Groups every checkpoint of one logical execution.
    pub thread_id: String,
    /// Dot-delimited subgraph path; empty string is the default namespace.
    pub checkpoint_ns: String,
    /// Prior checkpoint in the same thread and namespace, if any.
    pub parent_id: Option<String>,
    /// Optional tag hinting how to decode a polymorphic state payload.
    pub type_hint: Option<String>,
    /// The typed payload the workflow owns.
    pub state: S,
    /// Wall-clock instant of creation, taken from the caller verbatim.
    pub timestamp: DateTime<Utc>,
    /// Caller metadata (`source`, `step`, `node_name`, plus arbitrary extras).
    pub metadata: MetadataMap,
    /// Monotonic per-ID revision counter, starting at 1.
    pub version: i64,
}

impl<S: StateValue> Checkpoint<S> {
    /// Create a checkpoint in the default namespace, stamped with the
    /// current time.
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>, state: S) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            checkpoint_ns: String::new(),
            parent_id: None,
            type_hint: None,
            state,
            timestamp: Utc::now(),
            metadata: MetadataMap::default(),
            version: 1,
        }
    }

    /// Place the checkpoint in a namespace.
    #[must_use]
    pub fn with_namespace(mut self, checkpoint_ns: impl Into<String>) -> Self {
        self.checkpoint_ns = checkpoint_ns.into();
        self
    }

    /// Link to the checkpoint this one descends from.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Attach a decoding hint for polymorphic payloads.
    #[must_use]
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Override the creation timestamp. Savers store whatever the caller
    /// supplies here.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Insert one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Addressing config that resolves back to exactly this checkpoint.
    pub fn config(&self) -> CheckpointConfig {
        CheckpointConfig::new(&self.thread_id)
            .with_namespace(&self.checkpoint_ns)
            .with_checkpoint_id(&self.id)
    }
}

/// Out-of-band storage for a large per-channel value.
///
/// Keyed by `(thread_id, checkpoint_ns, channel, version)`, independently of
/// any checkpoint ID. By convention `version` is the ID of the checkpoint
/// that produced the value, but the layer does not enforce that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBlob {
    pub thread_id: String,
    pub checkpoint_ns: String,
    pub channel: String,
    pub version: String,
    pub type_hint: Option<String>,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl ChannelBlob {
    pub fn new(
        thread_id: impl Into<String>,
        checkpoint_ns: impl Into<String>,
        channel: impl Into<String>,
        version: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_ns: checkpoint_ns.into(),
            channel: channel.into(),
            version: version.into(),
            type_hint: None,
            data,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }
}

/// One staged channel write, logged against a checkpoint and a task.
///
/// Keyed by `(thread_id, checkpoint_ns, checkpoint_id, task_id, idx)`; `idx`
/// totally orders the writes of a single task so a recovering runtime can
/// replay them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub thread_id: String,
    pub checkpoint_ns: String,
    pub checkpoint_id: String,
    pub task_id: String,
    pub idx: i64,
    pub channel: String,
    pub type_hint: Option<String>,
    pub value: MetadataMap,
    pub created_at: DateTime<Utc>,
}

impl PendingWrite {
    pub fn new(
        thread_id: impl Into<String>,
        checkpoint_ns: impl Into<String>,
        checkpoint_id: impl Into<String>,
        task_id: impl Into<String>,
        idx: i64,
        channel: impl Into<String>,
        value: MetadataMap,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_ns: checkpoint_ns.into(),
            checkpoint_id: checkpoint_id.into(),
            task_id: task_id.into(),
            idx,
            channel: channel.into(),
            type_hint: None,
            value,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }
}
