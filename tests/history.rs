use threadvault::history::CheckpointHistory;
use threadvault::savers::{InMemorySaver, Saver};

mod common;
use common::*;

fn three_entry_history() -> CheckpointHistory<AgentState> {
    CheckpointHistory::from_list(vec![
        checkpoint_at("t1", "cp-1", 1, 30),
        checkpoint_at("t1", "cp-2", 2, 20),
        checkpoint_at("t1", "cp-3", 3, 10),
    ])
}

#[test]
fn cursor_starts_at_latest() {
    let history = three_entry_history();
    assert_eq!(history.len(), 3);
    assert_eq!(history.current().unwrap().id, "cp-3");
    assert_eq!(history.position(), Some(2));
}

#[test]
fn prev_walks_strictly_older() {
    let mut history = three_entry_history();
    let mut seen = vec![history.current().unwrap().timestamp];
    while history.prev() {
        seen.push(history.current().unwrap().timestamp);
    }
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(history.current().unwrap().id, "cp-1");
}

#[test]
fn next_walks_strictly_newer() {
    let mut history = three_entry_history();
    while history.prev() {}
    let mut seen = vec![history.current().unwrap().timestamp];
    while history.next() {
        seen.push(history.current().unwrap().timestamp);
    }
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn exhaustion_leaves_cursor_in_place() {
    let mut history = three_entry_history();
    assert!(!history.next());
    assert_eq!(history.current().unwrap().id, "cp-3");

    while history.prev() {}
    assert!(!history.prev());
    assert_eq!(history.current().unwrap().id, "cp-1");
}

#[test]
fn empty_history_has_no_current() {
    let mut history = CheckpointHistory::<AgentState>::from_list(vec![]);
    assert!(history.is_empty());
    assert!(history.current().is_none());
    assert!(!history.next());
    assert!(!history.prev());
}

#[tokio::test]
async fn capture_snapshots_a_saver() {
    let saver = InMemorySaver::new();
    for (i, age) in [(1, 20), (2, 10)] {
        saver
            .save(checkpoint_at("t1", &format!("cp-{i}"), i, age))
            .await
            .unwrap();
    }

    let mut history = CheckpointHistory::capture(&saver, "t1").await.unwrap();
    assert_eq!(history.current().unwrap().id, "cp-2");
    assert!(history.prev());
    assert_eq!(history.current().unwrap().id, "cp-1");
}
