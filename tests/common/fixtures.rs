#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use threadvault::checkpoint::{ChannelBlob, Checkpoint, MetadataMap, PendingWrite};

/// Stand-in for the state a graph runtime would checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub counter: i64,
    pub notes: Vec<String>,
}

pub fn agent_state(counter: i64) -> AgentState {
    AgentState {
        counter,
        notes: vec![],
    }
}

/// Whole-second instant `secs` seconds before now. SQL backends store whole
/// seconds, so fixtures stick to second precision to keep round-trip
/// equality exact.
pub fn seconds_ago(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp() - secs, 0).expect("instant in range")
}

/// Checkpoint in the default namespace with a whole-second timestamp.
pub fn checkpoint_at(
    thread_id: &str,
    id: &str,
    counter: i64,
    age_secs: i64,
) -> Checkpoint<AgentState> {
    Checkpoint::new(id, thread_id, agent_state(counter)).with_timestamp(seconds_ago(age_secs))
}

pub fn write_value(channel: &str, payload: i64) -> MetadataMap {
    let mut value = MetadataMap::default();
    value.insert("channel".into(), json!(channel));
    value.insert("payload".into(), json!(payload));
    value
}

pub fn pending_write(
    thread_id: &str,
    checkpoint_id: &str,
    task_id: &str,
    idx: i64,
) -> PendingWrite {
    PendingWrite::new(
        thread_id,
        "",
        checkpoint_id,
        task_id,
        idx,
        "messages",
        write_value("messages", idx),
    )
}

pub fn channel_blob(thread_id: &str, channel: &str, version: &str, data: &[u8]) -> ChannelBlob {
    ChannelBlob::new(thread_id, "", channel, version, data.to_vec())
        .with_type_hint("application/json")
}
