//! Storage contract and backend implementations.
//!
//! A saver persists the three record families of the layer: checkpoints,
//! per-task pending writes, and per-channel blobs. The contract is split
//! into three object-safe traits so a backend can implement exactly what it
//! supports; the bundled backends implement all three.
//!
//! # Backends
//!
//! - [`InMemorySaver`] - Volatile, process-local storage for tests
//! - `SqliteSaver` - Durable single-node storage (feature `sqlite`)
//! - `PostgresSaver` - Shared durable storage (feature `postgres`)
//!
//! # Design Principles
//!
//! - **Atomicity**: `save` is an upsert by primary key; a load never
//!   observes a partial write
//! - **Idempotency**: re-saving the same key replaces the row and nothing
//!   else
//! - **Isolation**: namespaces of one thread never leak into each other's
//!   listing, latest-selection, or deletion
//! - **Last-writer-wins**: concurrent saves to the same key converge to one
//!   writer's payload; which one is unspecified
//!
//! # Thread Safety
//!
//! All implementations are `Send + Sync` and usable across async tasks.
//! Every operation is an async suspension point; callers cancel by dropping
//! the future, and backends keep statement-level atomicity under
//! cancellation.

pub mod errors;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;

pub use errors::{SaverError, SaverResult};
pub use memory::{InMemorySaver, MemorySaverStats};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresSaver, PostgresSaverOptions};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSaver;

use crate::checkpoint::{ChannelBlob, Checkpoint, PendingWrite, StateValue};
use crate::config::CheckpointConfig;

/// Selects a backing implementation of the saver traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaverKind {
    /// Volatile process-local storage. Fast, non-durable; suitable for tests
    /// and ephemeral runs.
    InMemory,
    /// Embedded SQLite file (or in-memory sentinel) via `SqliteSaver`.
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// Networked PostgreSQL via `PostgresSaver`.
    #[cfg(feature = "postgres")]
    Postgres,
}

/// Backend-agnostic persistence of checkpoints.
///
/// # Semantics
///
/// - [`save`](Saver::save) upserts by `(thread_id, checkpoint_ns, id)`; an
///   empty `id` or `thread_id` is rejected with
///   [`SaverError::InvalidConfig`]. Durable backends return only after the
///   row is durable.
/// - [`load`](Saver::load) fetches the exact row when the config names an
///   ID, otherwise the row with the greatest timestamp in
///   `(thread_id, checkpoint_ns)`. Absence is
///   [`SaverError::NotFound`], never `Ok(None)`.
/// - [`list`](Saver::list) returns every checkpoint of the thread across all
///   namespaces, sorted by timestamp ascending.
/// - [`delete`](Saver::delete) requires an explicit checkpoint ID; deleting
///   a latest-selector is rejected so a config typo cannot cascade.
#[async_trait]
pub trait Saver<S>: Send + Sync
where
    S: StateValue,
{
    /// Upsert one checkpoint by its primary key.
    async fn save(&self, checkpoint: Checkpoint<S>) -> SaverResult<()>;

    /// Fetch the addressed checkpoint, or the latest of the scope when the
    /// config carries no ID.
    async fn load(&self, config: &CheckpointConfig) -> SaverResult<Checkpoint<S>>;

    /// Every checkpoint of `thread_id`, all namespaces, timestamp ascending.
    async fn list(&self, thread_id: &str) -> SaverResult<Vec<Checkpoint<S>>>;

    /// Delete one checkpoint addressed by an explicit ID.
    async fn delete(&self, config: &CheckpointConfig) -> SaverResult<()>;

    /// Remove every checkpoint, pending write, and blob of a thread.
    async fn delete_thread(&self, thread_id: &str) -> SaverResult<()>;

    /// Number of checkpoints stored in `(thread_id, checkpoint_ns)`.
    async fn count(&self, thread_id: &str, checkpoint_ns: &str) -> SaverResult<usize>;
}

/// Append-only log of pending channel writes.
#[async_trait]
pub trait WriteStore: Send + Sync {
    /// Upsert one write by `(thread, ns, checkpoint, task, idx)`.
    async fn save_write(&self, write: PendingWrite) -> SaverResult<()>;

    /// Persist a batch of writes, preserving each write's own `idx`.
    async fn save_writes(&self, writes: Vec<PendingWrite>) -> SaverResult<()> {
        for write in writes {
            self.save_write(write).await?;
        }
        Ok(())
    }

    /// All writes staged against a checkpoint, `idx` ascending.
    async fn list_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
    ) -> SaverResult<Vec<PendingWrite>>;

    /// Drop every write staged against a checkpoint.
    async fn delete_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
    ) -> SaverResult<()>;
}

/// Out-of-band storage for large per-channel values.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upsert one blob by `(thread, ns, channel, version)`.
    async fn save_blob(&self, blob: ChannelBlob) -> SaverResult<()>;

    /// Fetch one blob, or [`SaverError::NotFound`].
    async fn load_blob(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        channel: &str,
        version: &str,
    ) -> SaverResult<ChannelBlob>;

    /// Delete one blob, or [`SaverError::NotFound`] if absent.
    async fn delete_blob(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        channel: &str,
        version: &str,
    ) -> SaverResult<()>;
}

/// Shared call-site validation for `save`.
pub(crate) fn validate_checkpoint_key(thread_id: &str, id: &str) -> SaverResult<()> {
    if thread_id.is_empty() {
        return Err(SaverError::invalid_config(
            "checkpoint thread_id must not be empty",
        ));
    }
    if id.is_empty() {
        return Err(SaverError::invalid_config(
            "checkpoint id must not be empty",
        ));
    }
    Ok(())
}

/// Shared call-site validation for `list`/`count`/`delete_thread`.
pub(crate) fn validate_thread_id(thread_id: &str) -> SaverResult<()> {
    if thread_id.is_empty() {
        return Err(SaverError::invalid_config("thread_id must not be empty"));
    }
    Ok(())
}
