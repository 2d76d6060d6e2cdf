//! Property tests for the serialized interchange form.

use chrono::DateTime;
use proptest::prelude::*;
use serde_json::json;
use threadvault::checkpoint::Checkpoint;
use threadvault::persistence::{from_serialized, to_serialized};

mod common;
use common::{AgentState, agent_state};

fn arb_namespace() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,8}",
        "[a-z]{1,8}\\.[a-z]{1,8}",
        // A leading dot is part of the name, not a separator.
        "\\.[a-z]{1,8}",
    ]
}

proptest! {
    #[test]
    fn roundtrip_is_lossless(
        counter in any::<i64>(),
        notes in proptest::collection::vec("[a-zA-Z0-9 ]{0,16}", 0..4),
        ns in arb_namespace(),
        parent in proptest::option::of("[a-z0-9-]{1,12}"),
        secs in 0i64..4_000_000_000,
        version in 1i64..1000,
        meta_step in any::<i64>(),
        meta_flag in any::<bool>(),
        meta_note in "[a-zA-Z0-9 ]{0,24}",
    ) {
        let mut cp = Checkpoint::new("cp-prop", "t-prop", AgentState { counter, notes })
            .with_namespace(ns)
            .with_timestamp(DateTime::from_timestamp(secs, 0).unwrap())
            .with_metadata("step", json!(meta_step))
            .with_metadata("flag", json!(meta_flag))
            .with_metadata("note", json!(meta_note));
        cp.parent_id = parent;
        cp.version = version;

        let back: Checkpoint<AgentState> = from_serialized(to_serialized(&cp).unwrap()).unwrap();
        prop_assert_eq!(back, cp);
    }

    #[test]
    fn state_encoding_is_deterministic(counter in any::<i64>()) {
        let cp = Checkpoint::new("cp-det", "t-det", agent_state(counter));
        let a = to_serialized(&cp).unwrap();
        let b = to_serialized(&cp).unwrap();
        prop_assert_eq!(a.state, b.state);
    }
}
