use std::sync::Arc;

use serde_json::json;
use threadvault::checkpoint::Checkpoint;
use threadvault::config::CheckpointConfig;
use threadvault::savers::{BlobStore, InMemorySaver, Saver, SaverError, WriteStore};

mod common;
use common::*;

#[tokio::test]
async fn save_and_load_roundtrip() {
    let saver = InMemorySaver::new();
    let cp = checkpoint_at("t1", "cp-1", 5, 0)
        .with_metadata("node_name", json!("planner"))
        .with_parent("cp-0");
    saver.save(cp.clone()).await.unwrap();

    let loaded = saver.load(&cp.config()).await.unwrap();
    assert_eq!(loaded, cp);
    assert_eq!(loaded.state.counter, 5);
    assert!((chrono::Utc::now() - loaded.timestamp).num_seconds() < 5);
}

#[tokio::test]
async fn load_without_id_returns_latest() {
    let saver = InMemorySaver::new();
    for (i, age) in [(1, 30), (2, 20), (3, 10)] {
        saver
            .save(checkpoint_at("t1", &format!("cp-{i}"), i, age))
            .await
            .unwrap();
    }

    let latest = saver.load(&CheckpointConfig::new("t1")).await.unwrap();
    assert_eq!(latest.state.counter, 3);
    assert_eq!(latest.id, "cp-3");
}

#[tokio::test]
async fn load_empty_thread_is_not_found() {
    let saver = InMemorySaver::<AgentState>::new();
    let err = saver.load(&CheckpointConfig::new("ghost")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let saver = InMemorySaver::new();
    let root = checkpoint_at("t1", "cp-a", 1, 10);
    let sub = checkpoint_at("t1", "cp-a", 2, 5).with_namespace("sub");
    saver.save(root.clone()).await.unwrap();
    saver.save(sub.clone()).await.unwrap();

    let from_root = saver.load(&root.config()).await.unwrap();
    let from_sub = saver.load(&sub.config()).await.unwrap();
    assert_eq!(from_root.state.counter, 1);
    assert_eq!(from_sub.state.counter, 2);

    // Listing the thread spans namespaces; exact addressing never does.
    assert_eq!(saver.list("t1").await.unwrap().len(), 2);
    let crossed = CheckpointConfig::new("t1")
        .with_namespace("other")
        .with_checkpoint_id("cp-a");
    assert!(saver.load(&crossed).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn list_is_timestamp_ascending() {
    let saver = InMemorySaver::new();
    for (i, age) in [(1, 5), (2, 50), (3, 25)] {
        saver
            .save(checkpoint_at("t1", &format!("cp-{i}"), i, age))
            .await
            .unwrap();
    }
    let listed = saver.list("t1").await.unwrap();
    let counters: Vec<i64> = listed.iter().map(|cp| cp.state.counter).collect();
    assert_eq!(counters, vec![2, 3, 1]);
}

#[tokio::test]
async fn resave_replaces_the_row() {
    let saver = InMemorySaver::new();
    saver.save(checkpoint_at("t1", "cp-1", 1, 10)).await.unwrap();
    let mut replacement = checkpoint_at("t1", "cp-1", 99, 0);
    replacement.version = 2;
    saver.save(replacement.clone()).await.unwrap();

    let listed = saver.list("t1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state.counter, 99);
    assert_eq!(listed[0].version, 2);
}

#[tokio::test]
async fn delete_then_load_is_not_found() {
    let saver = InMemorySaver::new();
    let cp = checkpoint_at("t1", "cp-1", 1, 0);
    saver.save(cp.clone()).await.unwrap();

    saver.delete(&cp.config()).await.unwrap();
    assert!(saver.load(&cp.config()).await.unwrap_err().is_not_found());
    // Second delete reports the absence too.
    assert!(saver.delete(&cp.config()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_requires_an_explicit_id() {
    let saver = InMemorySaver::<AgentState>::new();
    let err = saver.delete(&CheckpointConfig::new("t1")).await.unwrap_err();
    assert!(matches!(err, SaverError::InvalidConfig { .. }));
}

#[tokio::test]
async fn save_rejects_empty_key_parts() {
    let saver = InMemorySaver::new();
    let no_id = Checkpoint::new("", "t1", agent_state(1));
    assert!(matches!(
        saver.save(no_id).await.unwrap_err(),
        SaverError::InvalidConfig { .. }
    ));
    let no_thread = Checkpoint::new("cp-1", "", agent_state(1));
    assert!(matches!(
        saver.save(no_thread).await.unwrap_err(),
        SaverError::InvalidConfig { .. }
    ));
}

#[tokio::test]
async fn writes_come_back_in_idx_order() {
    let saver = InMemorySaver::<AgentState>::new();
    for idx in [4, 0, 2, 1, 3] {
        saver
            .save_write(pending_write("t1", "cp-1", "task-1", idx))
            .await
            .unwrap();
    }
    let writes = saver.list_writes("t1", "", "cp-1").await.unwrap();
    let indices: Vec<i64> = writes.iter().map(|w| w.idx).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);

    saver.delete_writes("t1", "", "cp-1").await.unwrap();
    assert!(saver.list_writes("t1", "", "cp-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn blob_roundtrip_and_delete() {
    let saver = InMemorySaver::<AgentState>::new();
    let blob = channel_blob("t1", "messages", "cp-1", b"payload");
    saver.save_blob(blob.clone()).await.unwrap();

    let loaded = saver.load_blob("t1", "", "messages", "cp-1").await.unwrap();
    assert_eq!(loaded.data, b"payload");
    assert_eq!(loaded.type_hint.as_deref(), Some("application/json"));

    saver.delete_blob("t1", "", "messages", "cp-1").await.unwrap();
    assert!(saver
        .load_blob("t1", "", "messages", "cp-1")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn stats_and_clear() {
    let saver = InMemorySaver::new();
    saver.save(checkpoint_at("t1", "cp-1", 1, 20)).await.unwrap();
    saver.save(checkpoint_at("t1", "cp-2", 2, 10)).await.unwrap();
    saver
        .save(checkpoint_at("t2", "cp-1", 3, 5).with_namespace("sub"))
        .await
        .unwrap();

    let stats = saver.stats().unwrap();
    assert_eq!(stats.total_checkpoints, 3);
    assert_eq!(stats.total_threads, 2);
    assert_eq!(stats.total_namespaces, 2);

    saver.clear().unwrap();
    assert_eq!(saver.stats().unwrap().total_checkpoints, 0);
    assert!(saver.load(&CheckpointConfig::new("t1")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_thread_sweeps_all_records() {
    let saver = InMemorySaver::new();
    saver.save(checkpoint_at("t1", "cp-1", 1, 0)).await.unwrap();
    saver.save(checkpoint_at("t2", "cp-1", 2, 0)).await.unwrap();
    saver
        .save_write(pending_write("t1", "cp-1", "task-1", 0))
        .await
        .unwrap();
    saver
        .save_blob(channel_blob("t1", "messages", "cp-1", b"x"))
        .await
        .unwrap();

    saver.delete_thread("t1").await.unwrap();
    assert!(saver.list("t1").await.unwrap().is_empty());
    assert!(saver.list_writes("t1", "", "cp-1").await.unwrap().is_empty());
    assert!(saver
        .load_blob("t1", "", "messages", "cp-1")
        .await
        .unwrap_err()
        .is_not_found());
    // Other threads are untouched.
    assert_eq!(saver.list("t2").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_to_distinct_ids_all_land() {
    let saver = Arc::new(InMemorySaver::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let saver = Arc::clone(&saver);
        handles.push(tokio::spawn(async move {
            saver
                .save(checkpoint_at("t1", &format!("cp-{i:02}"), i, 0))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(saver.list("t1").await.unwrap().len(), 16);
    assert_eq!(saver.count("t1", "").await.unwrap(), 16);
}
