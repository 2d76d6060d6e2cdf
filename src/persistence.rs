//! Serialized interchange form for checkpoints.
//!
//! Design goals:
//! - Provide an explicit serde-friendly shape decoupled from the in-memory
//!   [`Checkpoint`](crate::checkpoint::Checkpoint) record.
//! - Keep conversion logic localized so the saver backends stay lean and
//!   declarative.
//! - Encode the state payload as opaque bytes; its internal layout is this
//!   module's concern and not part of any storage contract.
//!
//! This module intentionally does NOT perform I/O. It is pure data
//! transformation and (de)serialization glue. The encoding is deterministic
//! for scalars, sequences, and string-keyed mappings; map iteration order is
//! explicitly not part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, MetadataMap, StateValue};
use crate::savers::errors::{SaverError, SaverResult};

/// On-the-wire shape of a checkpoint: the scalar fields of the record with
/// the state flattened to bytes and the timestamp as an RFC 3339 string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerializedCheckpoint {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub checkpoint_ns: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub type_hint: Option<String>,
    /// Opaque encoded state bytes.
    pub state: Vec<u8>,
    /// RFC 3339 form of the creation instant.
    pub timestamp: String,
    #[serde(default)]
    pub metadata: MetadataMap,
    pub version: i64,
}

/// Flatten a checkpoint into its interchange form.
pub fn to_serialized<S: StateValue>(cp: &Checkpoint<S>) -> SaverResult<SerializedCheckpoint> {
    Ok(SerializedCheckpoint {
        id: cp.id.clone(),
        thread_id: cp.thread_id.clone(),
        checkpoint_ns: cp.checkpoint_ns.clone(),
        parent_id: cp.parent_id.clone(),
        type_hint: cp.type_hint.clone(),
        state: encode_state(&cp.id, &cp.state)?,
        timestamp: cp.timestamp.to_rfc3339(),
        metadata: cp.metadata.clone(),
        version: cp.version,
    })
}

/// Reconstruct a checkpoint, decoding the opaque bytes into the caller's
/// state type.
pub fn from_serialized<S: StateValue>(raw: SerializedCheckpoint) -> SaverResult<Checkpoint<S>> {
    let state = decode_state(&raw.id, &raw.state)?;
    let timestamp = parse_rfc3339(&raw.id, &raw.timestamp)?;
    Ok(Checkpoint {
        id: raw.id,
        thread_id: raw.thread_id,
        checkpoint_ns: raw.checkpoint_ns,
        parent_id: raw.parent_id,
        type_hint: raw.type_hint,
        state,
        timestamp,
        metadata: raw.metadata,
        version: raw.version,
    })
}

/// Encode a state payload to opaque bytes.
pub fn encode_state<S: StateValue>(checkpoint_id: &str, state: &S) -> SaverResult<Vec<u8>> {
    serde_json::to_vec(state)
        .map_err(|e| SaverError::serialize(format!("checkpoint `{checkpoint_id}` state"), e))
}

/// Decode opaque bytes back into the caller's state type.
pub fn decode_state<S: StateValue>(checkpoint_id: &str, bytes: &[u8]) -> SaverResult<S> {
    serde_json::from_slice(bytes)
        .map_err(|e| SaverError::deserialize(format!("checkpoint `{checkpoint_id}` state"), e))
}

/// Encode a metadata (or write-value) map to bytes for SQL storage.
pub fn encode_map(what: &str, map: &MetadataMap) -> SaverResult<Vec<u8>> {
    serde_json::to_vec(map).map_err(|e| SaverError::serialize(what.to_string(), e))
}

/// Decode a metadata (or write-value) map from SQL storage.
pub fn decode_map(what: &str, bytes: &[u8]) -> SaverResult<MetadataMap> {
    serde_json::from_slice(bytes).map_err(|e| SaverError::deserialize(what.to_string(), e))
}

/// Reconstruct an instant stored as whole seconds since the epoch.
pub fn from_epoch_seconds(what: &str, secs: i64) -> SaverResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| SaverError::DeserializeFailed {
        what: format!("{what}: stored timestamp {secs} is out of range"),
        source: "epoch seconds out of chrono range".into(),
    })
}

fn parse_rfc3339(checkpoint_id: &str, raw: &str) -> SaverResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SaverError::deserialize(format!("checkpoint `{checkpoint_id}` timestamp"), e))
}
