//! Higher-level façade over any saver.
//!
//! The manager owns what a graph runtime should not have to repeat at every
//! call site: ID generation, metadata stamping for auto-saves, latest-of-
//! thread lookup, and history pruning. Everything else is pure delegation to
//! the saver it wraps.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::checkpoint::{Checkpoint, META_SOURCE, META_STEP, SOURCE_AUTO, SOURCE_MANUAL, StateValue};
use crate::config::CheckpointConfig;
use crate::history::CheckpointHistory;
use crate::savers::{Saver, SaverError, SaverResult};
use crate::utils::ids::IdGenerator;

/// Result of a [`CheckpointManager::prune_old_checkpoints`] sweep.
///
/// Pruning is best-effort across rows: deletions continue past transient
/// failures, `deleted` counts the rows actually removed, and `first_error`
/// carries the first non-recoverable failure seen along the way.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub deleted: usize,
    pub first_error: Option<SaverError>,
}

/// Thin façade layered over a [`Saver`].
pub struct CheckpointManager<S> {
    saver: Arc<dyn Saver<S>>,
    ids: IdGenerator,
}

impl<S: StateValue> CheckpointManager<S> {
    pub fn new(saver: Arc<dyn Saver<S>>) -> Self {
        Self {
            saver,
            ids: IdGenerator::new(),
        }
    }

    /// The wrapped saver, for operations the façade does not cover.
    pub fn saver(&self) -> &Arc<dyn Saver<S>> {
        &self.saver
    }

    /// Save `state` as a checkpoint addressed by `config`.
    ///
    /// Generates an ID when the config carries none, stamps the creation
    /// time, carries the config's metadata over (defaulting `source` to
    /// `"manual"`), and returns the checkpoint as written.
    #[instrument(skip(self, state, config), fields(thread_id = %config.thread_id), err)]
    pub async fn save_checkpoint(
        &self,
        state: S,
        config: &CheckpointConfig,
    ) -> SaverResult<Checkpoint<S>> {
        config.validate()?;
        let id = config
            .checkpoint_id
            .clone()
            .unwrap_or_else(|| self.ids.next_checkpoint_id());

        let mut metadata = config.metadata.clone();
        metadata
            .entry(META_SOURCE.to_string())
            .or_insert_with(|| json!(SOURCE_MANUAL));

        let checkpoint = Checkpoint {
            id,
            thread_id: config.thread_id.clone(),
            checkpoint_ns: config.checkpoint_ns.clone(),
            parent_id: None,
            type_hint: None,
            state,
            timestamp: Utc::now(),
            metadata,
            version: 1,
        };
        self.saver.save(checkpoint.clone()).await?;
        Ok(checkpoint)
    }

    /// Pure delegation to [`Saver::load`].
    pub async fn load_checkpoint(&self, config: &CheckpointConfig) -> SaverResult<Checkpoint<S>> {
        self.saver.load(config).await
    }

    /// Save `state` on the auto-save path: default namespace, generated ID,
    /// metadata stamped with `source="auto"` and the step counter.
    #[instrument(skip(self, state), err)]
    pub async fn auto_save(
        &self,
        state: S,
        thread_id: &str,
        step: i64,
    ) -> SaverResult<Checkpoint<S>> {
        let config = CheckpointConfig::new(thread_id)
            .with_metadata(META_SOURCE, json!(SOURCE_AUTO))
            .with_metadata(META_STEP, json!(step));
        self.save_checkpoint(state, &config).await
    }

    /// Latest checkpoint of the thread's default namespace.
    pub async fn latest_checkpoint(&self, thread_id: &str) -> SaverResult<Checkpoint<S>> {
        self.saver.load(&CheckpointConfig::new(thread_id)).await
    }

    /// Pure delegation to [`Saver::list`].
    pub async fn list_checkpoints(&self, thread_id: &str) -> SaverResult<Vec<Checkpoint<S>>> {
        self.saver.list(thread_id).await
    }

    /// Snapshot the thread's history into a time-travel cursor.
    pub async fn history(&self, thread_id: &str) -> SaverResult<CheckpointHistory<S>> {
        Ok(CheckpointHistory::from_list(
            self.saver.list(thread_id).await?,
        ))
    }

    /// Delete all but the `keep` most recent checkpoints of the thread.
    ///
    /// Rows are deleted one by one, oldest first; a row someone else already
    /// deleted is skipped silently.
    #[instrument(skip(self), err)]
    pub async fn prune_old_checkpoints(
        &self,
        thread_id: &str,
        keep: usize,
    ) -> SaverResult<PruneOutcome> {
        let checkpoints = self.saver.list(thread_id).await?;
        let mut outcome = PruneOutcome::default();
        if checkpoints.len() <= keep {
            return Ok(outcome);
        }

        let excess = checkpoints.len() - keep;
        for checkpoint in &checkpoints[..excess] {
            match self.saver.delete(&checkpoint.config()).await {
                Ok(()) => outcome.deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(checkpoint_id = %checkpoint.id, error = %e, "prune delete failed");
                    if outcome.first_error.is_none() {
                        outcome.first_error = Some(e);
                    }
                }
            }
        }
        Ok(outcome)
    }
}
