//! # Threadvault: Checkpoint Persistence for Graph Workflows
//!
//! Threadvault is the persistence layer for graph-driven agent workflows. It
//! captures snapshots of a workflow's typed state (checkpoints), groups them
//! into threads, and stores them through pluggable backends so a run can be
//! resumed, inspected, or rewound after a failure.
//!
//! ## Core Concepts
//!
//! - **Checkpoint**: A snapshot of a thread's state at a point in time, with
//!   identity, lineage, and metadata
//! - **Thread**: A logical execution instance; all checkpoints of one run
//!   share a thread ID
//! - **Namespace**: A dot-delimited path isolating nested subgraphs within a
//!   thread (the empty string is the default namespace)
//! - **Saver**: The backend-agnostic storage contract
//! - **Manager**: A façade adding ID generation, auto-save, latest lookup,
//!   and pruning
//! - **History**: A time-travel cursor over a thread's checkpoints
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use threadvault::config::CheckpointConfig;
//! use threadvault::manager::CheckpointManager;
//! use threadvault::savers::InMemorySaver;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
//! struct AgentState {
//!     counter: i64,
//! }
//!
//! # async fn example() -> Result<(), threadvault::savers::SaverError> {
//! let manager = CheckpointManager::new(Arc::new(InMemorySaver::<AgentState>::new()));
//!
//! // Auto-save stamps source/step metadata and generates an ID.
//! let saved = manager
//!     .auto_save(AgentState { counter: 1 }, "thread-1", 0)
//!     .await?;
//!
//! // Load it back, either by ID or as latest-of-thread.
//! let config = CheckpointConfig::new("thread-1").with_checkpoint_id(&saved.id);
//! let loaded = manager.load_checkpoint(&config).await?;
//! assert_eq!(loaded.state.counter, 1);
//!
//! let latest = manager.latest_checkpoint("thread-1").await?;
//! assert_eq!(latest.id, saved.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence Backends
//!
//! - [`savers::InMemorySaver`] - Volatile storage for testing and development
//! - `savers::SqliteSaver` - Durable single-node storage (feature `sqlite`,
//!   on by default)
//! - `savers::PostgresSaver` - Shared durable storage (feature `postgres`)
//!
//! All backends speak the same three-table model: checkpoints, per-channel
//! blobs, and per-task pending writes.
//!
//! ## Module Guide
//!
//! - [`checkpoint`] - Checkpoint, blob, and pending-write records
//! - [`config`] - Addressing triple `(thread, namespace, id?)` and builder
//! - [`persistence`] - Serialized interchange form, pure of I/O
//! - [`savers`] - Storage contract and the backend implementations
//! - [`manager`] - Higher-level façade over any saver
//! - [`history`] - Snapshot cursor for time travel
//! - [`settings`] - Environment-driven backend selection
//! - [`telemetry`] - Opt-in tracing subscriber setup

pub mod checkpoint;
pub mod config;
pub mod history;
pub mod manager;
pub mod persistence;
pub mod savers;
pub mod settings;
pub mod telemetry;
pub mod utils;
