/*!
SQLite Saver

Durable single-node storage over `sqlx`. One database file (or the in-memory
sentinel) holds the three tables of the layer:

- `checkpoints` keyed by `(thread_id, checkpoint_ns, id)`
- `checkpoint_blobs` keyed by `(thread_id, checkpoint_ns, channel, version)`
- `checkpoint_writes` keyed by `(thread_id, checkpoint_ns, checkpoint_id,
  task_id, idx)`

## Behavior

- The schema is created idempotently on connect; a failure there surfaces as
  `SchemaInitFailed` and no saver is returned.
- `state`, `metadata`, and `value` columns hold encoded bytes produced by the
  persistence module; `timestamp` and `created_at` hold whole seconds since
  the epoch.
- `save` uses `INSERT OR REPLACE` against the primary key, so re-saving the
  same ID is idempotent and atomic at the row level.
- The in-memory sentinel (`sqlite::memory:`) pins the pool to a single
  long-lived connection; separate pooled connections would each see their
  own empty database.
*/

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, sqlite::SqliteConnectOptions};
use tracing::instrument;

use crate::checkpoint::{ChannelBlob, Checkpoint, PendingWrite, StateValue};
use crate::config::CheckpointConfig;
use crate::persistence;
use crate::savers::errors::{SaverError, SaverResult};
use crate::savers::{
    BlobStore, Saver, WriteStore, validate_checkpoint_key, validate_thread_id,
};

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS checkpoints (
        thread_id     TEXT NOT NULL,
        checkpoint_ns TEXT NOT NULL DEFAULT '',
        id            TEXT NOT NULL,
        parent_id     TEXT,
        type          TEXT,
        state         BLOB NOT NULL,
        timestamp     INTEGER NOT NULL,
        metadata      BLOB NOT NULL,
        version       INTEGER NOT NULL DEFAULT 1,
        created_at    INTEGER NOT NULL,
        PRIMARY KEY (thread_id, checkpoint_ns, id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_checkpoints_thread_ns
        ON checkpoints (thread_id, checkpoint_ns)",
    "CREATE INDEX IF NOT EXISTS idx_checkpoints_timestamp
        ON checkpoints (timestamp DESC)",
    r"
    CREATE TABLE IF NOT EXISTS checkpoint_blobs (
        thread_id     TEXT NOT NULL,
        checkpoint_ns TEXT NOT NULL DEFAULT '',
        channel       TEXT NOT NULL,
        version       TEXT NOT NULL,
        type          TEXT,
        data          BLOB NOT NULL,
        created_at    INTEGER NOT NULL,
        PRIMARY KEY (thread_id, checkpoint_ns, channel, version)
    )",
    r"
    CREATE TABLE IF NOT EXISTS checkpoint_writes (
        thread_id     TEXT NOT NULL,
        checkpoint_ns TEXT NOT NULL DEFAULT '',
        checkpoint_id TEXT NOT NULL,
        task_id       TEXT NOT NULL,
        idx           INTEGER NOT NULL,
        channel       TEXT NOT NULL,
        type          TEXT,
        value         BLOB NOT NULL,
        created_at    INTEGER NOT NULL,
        PRIMARY KEY (thread_id, checkpoint_ns, checkpoint_id, task_id, idx)
    )",
];

/// SQLite-backed saver.
///
/// # Storage Growth
///
/// Storage grows roughly with `(threads x checkpoints_per_thread x
/// state_size)`. Long-running applications should prune through the manager
/// or delete whole threads when workflows complete.
pub struct SqliteSaver<S> {
    pool: SqlitePool,
    _state: PhantomData<fn() -> S>,
}

impl<S> std::fmt::Debug for SqliteSaver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSaver").finish()
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl<S: StateValue> SqliteSaver<S> {
    /// Connect to (or create) a SQLite database at `database_url` and build
    /// the schema. Example URLs: `sqlite://threadvault.db`,
    /// `sqlite::memory:`.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> SaverResult<Self> {
        let pool = if is_memory_url(database_url) {
            // One pinned connection; the database dies with it.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await
        } else {
            let options = database_url
                .parse::<SqliteConnectOptions>()
                .map_err(|e| SaverError::backend(format!("invalid SQLite URL `{database_url}`"), e))?
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await
        }
        .map_err(|e| SaverError::backend("connect to SQLite", e))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| SaverError::schema_init("create SQLite schema", e))?;
        }

        Ok(Self {
            pool,
            _state: PhantomData,
        })
    }

    /// The underlying pool, for maintenance queries in tests and tooling.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_checkpoint(row: &SqliteRow) -> SaverResult<Checkpoint<S>> {
        let id: String = row.get("id");
        let state_bytes: Vec<u8> = row.get("state");
        let metadata_bytes: Vec<u8> = row.get("metadata");
        let timestamp: i64 = row.get("timestamp");
        Ok(Checkpoint {
            state: persistence::decode_state(&id, &state_bytes)?,
            metadata: persistence::decode_map(&format!("checkpoint `{id}` metadata"), &metadata_bytes)?,
            timestamp: persistence::from_epoch_seconds(&format!("checkpoint `{id}`"), timestamp)?,
            thread_id: row.get("thread_id"),
            checkpoint_ns: row.get("checkpoint_ns"),
            parent_id: row.get("parent_id"),
            type_hint: row.get("type"),
            version: row.get("version"),
            id,
        })
    }

    fn row_to_write(row: &SqliteRow) -> SaverResult<PendingWrite> {
        let checkpoint_id: String = row.get("checkpoint_id");
        let value_bytes: Vec<u8> = row.get("value");
        let created_at: i64 = row.get("created_at");
        Ok(PendingWrite {
            value: persistence::decode_map(
                &format!("write value for checkpoint `{checkpoint_id}`"),
                &value_bytes,
            )?,
            created_at: persistence::from_epoch_seconds("pending write", created_at)?,
            thread_id: row.get("thread_id"),
            checkpoint_ns: row.get("checkpoint_ns"),
            task_id: row.get("task_id"),
            idx: row.get("idx"),
            channel: row.get("channel"),
            type_hint: row.get("type"),
            checkpoint_id,
        })
    }
}

#[async_trait]
impl<S: StateValue> Saver<S> for SqliteSaver<S> {
    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, id = %checkpoint.id), err)]
    async fn save(&self, checkpoint: Checkpoint<S>) -> SaverResult<()> {
        validate_checkpoint_key(&checkpoint.thread_id, &checkpoint.id)?;
        let state = persistence::encode_state(&checkpoint.id, &checkpoint.state)?;
        let metadata = persistence::encode_map(
            &format!("checkpoint `{}` metadata", checkpoint.id),
            &checkpoint.metadata,
        )?;

        sqlx::query(
            r"
            INSERT OR REPLACE INTO checkpoints (
                thread_id, checkpoint_ns, id, parent_id, type,
                state, timestamp, metadata, version, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(&checkpoint.thread_id)
        .bind(&checkpoint.checkpoint_ns)
        .bind(&checkpoint.id)
        .bind(&checkpoint.parent_id)
        .bind(&checkpoint.type_hint)
        .bind(&state)
        .bind(checkpoint.timestamp.timestamp())
        .bind(&metadata)
        .bind(checkpoint.version)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("insert checkpoint", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(config = %config), err)]
    async fn load(&self, config: &CheckpointConfig) -> SaverResult<Checkpoint<S>> {
        config.validate()?;
        let row = match &config.checkpoint_id {
            Some(id) => sqlx::query(
                r"
                SELECT thread_id, checkpoint_ns, id, parent_id, type,
                       state, timestamp, metadata, version
                FROM checkpoints
                WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND id = ?3
                ",
            )
            .bind(&config.thread_id)
            .bind(&config.checkpoint_ns)
            .bind(id)
            .fetch_optional(&self.pool)
            .await,
            None => sqlx::query(
                r"
                SELECT thread_id, checkpoint_ns, id, parent_id, type,
                       state, timestamp, metadata, version
                FROM checkpoints
                WHERE thread_id = ?1 AND checkpoint_ns = ?2
                ORDER BY timestamp DESC
                LIMIT 1
                ",
            )
            .bind(&config.thread_id)
            .bind(&config.checkpoint_ns)
            .fetch_optional(&self.pool)
            .await,
        }
        .map_err(|e| SaverError::backend("select checkpoint", e))?;

        match row {
            Some(row) => Self::row_to_checkpoint(&row),
            None => Err(SaverError::checkpoint_not_found(
                &config.thread_id,
                &config.checkpoint_ns,
                config.checkpoint_id.as_deref(),
            )),
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self, thread_id: &str) -> SaverResult<Vec<Checkpoint<S>>> {
        validate_thread_id(thread_id)?;
        let rows = sqlx::query(
            r"
            SELECT thread_id, checkpoint_ns, id, parent_id, type,
                   state, timestamp, metadata, version
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY timestamp ASC
            ",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SaverError::backend("list checkpoints", e))?;

        rows.iter().map(Self::row_to_checkpoint).collect()
    }

    #[instrument(skip(self), fields(config = %config), err)]
    async fn delete(&self, config: &CheckpointConfig) -> SaverResult<()> {
        let id = config.require_checkpoint_id()?;
        let result = sqlx::query(
            "DELETE FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND id = ?3",
        )
        .bind(&config.thread_id)
        .bind(&config.checkpoint_ns)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("delete checkpoint", e))?;

        if result.rows_affected() == 0 {
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
        for table in ["checkpoint_writes", "checkpoint_blobs", "checkpoints"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE thread_id = ?1"))
                .bind(thread_id)
                .execute(&self.pool)
                .await
                .map_err(|e| SaverError::backend(format!("delete thread from {table}"), e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self, thread_id: &str, checkpoint_ns: &str) -> SaverResult<usize> {
        validate_thread_id(thread_id)?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2",
        )
        .bind(thread_id)
        .bind(checkpoint_ns)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SaverError::backend("count checkpoints", e))?;
        Ok(total as usize)
    }
}

#[async_trait]
impl<S: StateValue> WriteStore for SqliteSaver<S> {
    #[instrument(skip(self, write), fields(thread_id = %write.thread_id, idx = write.idx), err)]
    async fn save_write(&self, write: PendingWrite) -> SaverResult<()> {
        validate_checkpoint_key(&write.thread_id, &write.checkpoint_id)?;
        let value = persistence::encode_map(
            &format!("write value for checkpoint `{}`", write.checkpoint_id),
            &write.value,
        )?;
        sqlx::query(
            r"
            INSERT OR REPLACE INTO checkpoint_writes (
                thread_id, checkpoint_ns, checkpoint_id, task_id, idx,
                channel, type, value, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(&write.thread_id)
        .bind(&write.checkpoint_ns)
        .bind(&write.checkpoint_id)
        .bind(&write.task_id)
        .bind(write.idx)
        .bind(&write.channel)
        .bind(&write.type_hint)
        .bind(&value)
        .bind(write.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("insert pending write", e))?;
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
        let rows = sqlx::query(
            r"
            SELECT thread_id, checkpoint_ns, checkpoint_id, task_id, idx,
                   channel, type, value, created_at
            FROM checkpoint_writes
            WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3
            ORDER BY idx ASC, task_id ASC
            ",
        )
        .bind(thread_id)
        .bind(checkpoint_ns)
        .bind(checkpoint_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SaverError::backend("list pending writes", e))?;

        rows.iter().map(Self::row_to_write).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
    ) -> SaverResult<()> {
        validate_thread_id(thread_id)?;
        sqlx::query(
            r"
            DELETE FROM checkpoint_writes
            WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3
            ",
        )
        .bind(thread_id)
        .bind(checkpoint_ns)
        .bind(checkpoint_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("delete pending writes", e))?;
        Ok(())
    }
}

#[async_trait]
impl<S: StateValue> BlobStore for SqliteSaver<S> {
    #[instrument(skip(self, blob), fields(thread_id = %blob.thread_id, channel = %blob.channel), err)]
    async fn save_blob(&self, blob: ChannelBlob) -> SaverResult<()> {
        validate_thread_id(&blob.thread_id)?;
        sqlx::query(
            r"
            INSERT OR REPLACE INTO checkpoint_blobs (
                thread_id, checkpoint_ns, channel, version, type, data, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&blob.thread_id)
        .bind(&blob.checkpoint_ns)
        .bind(&blob.channel)
        .bind(&blob.version)
        .bind(&blob.type_hint)
        .bind(&blob.data)
        .bind(blob.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("insert blob", e))?;
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
        let row = sqlx::query(
            r"
            SELECT thread_id, checkpoint_ns, channel, version, type, data, created_at
            FROM checkpoint_blobs
            WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND channel = ?3 AND version = ?4
            ",
        )
        .bind(thread_id)
        .bind(checkpoint_ns)
        .bind(channel)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SaverError::backend("select blob", e))?
        .ok_or_else(|| SaverError::blob_not_found(thread_id, checkpoint_ns, channel, version))?;

        let created_at: i64 = row.get("created_at");
        Ok(ChannelBlob {
            thread_id: row.get("thread_id"),
            checkpoint_ns: row.get("checkpoint_ns"),
            channel: row.get("channel"),
            version: row.get("version"),
            type_hint: row.get("type"),
            data: row.get("data"),
            created_at: persistence::from_epoch_seconds("blob", created_at)?,
        })
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
        let result = sqlx::query(
            r"
            DELETE FROM checkpoint_blobs
            WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND channel = ?3 AND version = ?4
            ",
        )
        .bind(thread_id)
        .bind(checkpoint_ns)
        .bind(channel)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| SaverError::backend("delete blob", e))?;

        if result.rows_affected() == 0 {
            return Err(SaverError::blob_not_found(
                thread_id, checkpoint_ns, channel, version,
            ));
        }
        Ok(())
    }
}
