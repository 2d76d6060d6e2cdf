//! In-memory saver.
//!
//! Process-local and volatile; intended for tests and ephemeral runs.
//! Checkpoints live in a nested map `thread -> namespace -> id`, writes and
//! blobs in parallel maps keyed by their own primary keys. All mutations go
//! through a single reader/writer lock, so lookups are linearizable: many
//! concurrent readers, one writer.

use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::checkpoint::{ChannelBlob, Checkpoint, PendingWrite, StateValue};
use crate::config::CheckpointConfig;
use crate::savers::errors::{SaverError, SaverResult};
use crate::savers::{
    BlobStore, Saver, WriteStore, validate_checkpoint_key, validate_thread_id,
};

/// `namespace -> id -> checkpoint`
type NamespaceShelf<S> = FxHashMap<String, FxHashMap<String, Checkpoint<S>>>;

/// `(thread, ns, checkpoint, task, idx)`
type WriteKey = (String, String, String, String, i64);

/// `(thread, ns, channel, version)`
type BlobKey = (String, String, String, String);

/// Counts reported by [`InMemorySaver::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySaverStats {
    pub total_checkpoints: usize,
    pub total_threads: usize,
    /// Distinct `(thread, namespace)` scopes currently holding checkpoints.
    pub total_namespaces: usize,
}

/// Volatile saver backed by process memory.
pub struct InMemorySaver<S> {
    checkpoints: RwLock<FxHashMap<String, NamespaceShelf<S>>>,
    writes: RwLock<FxHashMap<WriteKey, PendingWrite>>,
    blobs: RwLock<FxHashMap<BlobKey, ChannelBlob>>,
}

impl<S> Default for InMemorySaver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> InMemorySaver<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkpoints: RwLock::new(FxHashMap::default()),
            writes: RwLock::new(FxHashMap::default()),
            blobs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Aggregate counters over the stored checkpoints.
    pub fn stats(&self) -> SaverResult<MemorySaverStats> {
        let map = self.checkpoints.read().map_err(poisoned)?;
        let total_threads = map
            .values()
            .filter(|ns| ns.values().any(|ids| !ids.is_empty()))
            .count();
        let total_namespaces = map
            .values()
            .map(|ns| ns.values().filter(|ids| !ids.is_empty()).count())
            .sum();
        let total_checkpoints = map
            .values()
            .flat_map(|ns| ns.values())
            .map(FxHashMap::len)
            .sum();
        Ok(MemorySaverStats {
            total_checkpoints,
            total_threads,
            total_namespaces,
        })
    }

    /// Drop everything: checkpoints, writes, and blobs.
    pub fn clear(&self) -> SaverResult<()> {
        self.checkpoints.write().map_err(poisoned)?.clear();
        self.writes.write().map_err(poisoned)?.clear();
        self.blobs.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> SaverError {
    SaverError::backend_message(format!("lock poisoned: {e}"))
}

#[async_trait]
impl<S: StateValue> Saver<S> for InMemorySaver<S> {
    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, id = %checkpoint.id), err)]
    async fn save(&self, checkpoint: Checkpoint<S>) -> SaverResult<()> {
        validate_checkpoint_key(&checkpoint.thread_id, &checkpoint.id)?;
        let mut map = self.checkpoints.write().map_err(poisoned)?;
        map.entry(checkpoint.thread_id.clone())
            .or_default()
            .entry(checkpoint.checkpoint_ns.clone())
            .or_default()
            .insert(checkpoint.id.clone(), checkpoint);
        Ok(())
    }

    #[instrument(skip(self), fields(config = %config), err)]
    async fn load(&self, config: &CheckpointConfig) -> SaverResult<Checkpoint<S>> {
        config.validate()?;
        let map = self.checkpoints.read().map_err(poisoned)?;
        let shelf = map
            .get(&config.thread_id)
            .and_then(|ns| ns.get(&config.checkpoint_ns));
        let not_found = || {
            SaverError::checkpoint_not_found(
                &config.thread_id,
                &config.checkpoint_ns,
                config.checkpoint_id.as_deref(),
            )
        };
        let shelf = shelf.ok_or_else(not_found)?;
        match &config.checkpoint_id {
            Some(id) => shelf.get(id).cloned().ok_or_else(not_found),
            None => shelf
                .values()
                .max_by_key(|cp| cp.timestamp)
                .cloned()
                .ok_or_else(not_found),
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self, thread_id: &str) -> SaverResult<Vec<Checkpoint<S>>> {
        validate_thread_id(thread_id)?;
        let map = self.checkpoints.read().map_err(poisoned)?;
        let mut all: Vec<Checkpoint<S>> = map
            .get(thread_id)
            .into_iter()
            .flat_map(|ns| ns.values())
            .flat_map(|ids| ids.values())
            .cloned()
            .collect();
        all.sort_by_key(|cp| cp.timestamp);
        Ok(all)
    }

    #[instrument(skip(self), fields(config = %config), err)]
    async fn delete(&self, config: &CheckpointConfig) -> SaverResult<()> {
        let id = config.require_checkpoint_id()?;
        let mut map = self.checkpoints.write().map_err(poisoned)?;
        let removed = map
            .get_mut(&config.thread_id)
            .and_then(|ns| ns.get_mut(&config.checkpoint_ns))
            .and_then(|ids| ids.remove(id));
        if removed.is_none() {
            return Err(SaverError::checkpoint_not_found(
                &config.thread_id,
                &config.checkpoint_ns,
                Some(id),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_thread(&self, thread_id: &str) -> SaverResult<()> {
        validate_thread_id(thread_id)?;
        self.checkpoints
            .write()
            .map_err(poisoned)?
            .remove(thread_id);
        self.writes
            .write()
            .map_err(poisoned)?
            .retain(|key, _| key.0 != thread_id);
        self.blobs
            .write()
            .map_err(poisoned)?
            .retain(|key, _| key.0 != thread_id);
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self, thread_id: &str, checkpoint_ns: &str) -> SaverResult<usize> {
        validate_thread_id(thread_id)?;
        let map = self.checkpoints.read().map_err(poisoned)?;
        Ok(map
            .get(thread_id)
            .and_then(|ns| ns.get(checkpoint_ns))
            .map_or(0, FxHashMap::len))
    }
}

#[async_trait]
impl<S: StateValue> WriteStore for InMemorySaver<S> {
    #[instrument(skip(self, write), fields(thread_id = %write.thread_id, idx = write.idx), err)]
    async fn save_write(&self, write: PendingWrite) -> SaverResult<()> {
        validate_checkpoint_key(&write.thread_id, &write.checkpoint_id)?;
        let key = (
            write.thread_id.clone(),
            write.checkpoint_ns.clone(),
            write.checkpoint_id.clone(),
            write.task_id.clone(),
            write.idx,
        );
        self.writes.write().map_err(poisoned)?.insert(key, write);
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
    ) -> SaverResult<Vec<PendingWrite>> {
        validate_thread_id(thread_id)?;
        let map = self.writes.read().map_err(poisoned)?;
        let mut matched: Vec<PendingWrite> = map
            .iter()
            .filter(|(key, _)| {
                key.0 == thread_id && key.1 == checkpoint_ns && key.2 == checkpoint_id
            })
            .map(|(_, write)| write.clone())
            .collect();
        matched.sort_by(|a, b| a.idx.cmp(&b.idx).then_with(|| a.task_id.cmp(&b.task_id)));
        Ok(matched)
    }

    #[instrument(skip(self), err)]
    async fn delete_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
    ) -> SaverResult<()> {
        validate_thread_id(thread_id)?;
        self.writes.write().map_err(poisoned)?.retain(|key, _| {
            !(key.0 == thread_id && key.1 == checkpoint_ns && key.2 == checkpoint_id)
        });
        Ok(())
    }
}

#[async_trait]
impl<S: StateValue> BlobStore for InMemorySaver<S> {
    #[instrument(skip(self, blob), fields(thread_id = %blob.thread_id, channel = %blob.channel), err)]
    async fn save_blob(&self, blob: ChannelBlob) -> SaverResult<()> {
        validate_thread_id(&blob.thread_id)?;
        let key = (
            blob.thread_id.clone(),
            blob.checkpoint_ns.clone(),
            blob.channel.clone(),
            blob.version.clone(),
        );
        self.blobs.write().map_err(poisoned)?.insert(key, blob);
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_blob(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        channel: &str,
        version: &str,
    ) -> SaverResult<ChannelBlob> {
        validate_thread_id(thread_id)?;
        let key = (
            thread_id.to_string(),
            checkpoint_ns.to_string(),
            channel.to_string(),
            version.to_string(),
        );
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(&key)
            .cloned()
            .ok_or_else(|| SaverError::blob_not_found(thread_id, checkpoint_ns, channel, version))
    }

    #[instrument(skip(self), err)]
    async fn delete_blob(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        channel: &str,
        version: &str,
    ) -> SaverResult<()> {
        validate_thread_id(thread_id)?;
        let key = (
            thread_id.to_string(),
            checkpoint_ns.to_string(),
            channel.to_string(),
            version.to_string(),
        );
        if self.blobs.write().map_err(poisoned)?.remove(&key).is_none() {
            return Err(SaverError::blob_not_found(
                thread_id,
                checkpoint_ns,
                channel,
                version,
            ));
        }
        Ok(())
    }
}
