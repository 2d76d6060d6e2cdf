//! Error taxonomy shared by every saver backend.
//!
//! Callers match on the variant, never on message text. Backends wrap their
//! native transport errors into one of these kinds; the underlying cause is
//! kept as the error source for diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Boxed transport-level cause preserved behind a [`SaverError`] kind.
pub type BackendCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from saver operations.
#[derive(Debug, Error, Diagnostic)]
pub enum SaverError {
    /// The addressed checkpoint (or blob) does not exist.
    ///
    /// Expected for latest-lookup on empty threads and for delete races;
    /// callers decide whether this is fatal.
    #[error("{locator} not found")]
    #[diagnostic(
        code(threadvault::saver::not_found),
        help("Nothing is stored at {locator}. Check the thread, namespace, and ID.")
    )]
    NotFound { locator: String },

    /// The supplied config violates a call-site invariant.
    #[error("invalid config: {reason}")]
    #[diagnostic(
        code(threadvault::saver::invalid_config),
        help("This is a programmer error at the call site; do not retry.")
    )]
    InvalidConfig { reason: String },

    /// The state payload (or metadata) could not be encoded.
    #[error("failed to serialize {what}: {source}")]
    #[diagnostic(
        code(threadvault::saver::serialize_failed),
        help("The state type is not encodable; fix the type, retrying will not help.")
    )]
    SerializeFailed {
        what: String,
        #[source]
        source: BackendCause,
    },

    /// Stored bytes could not be decoded into the caller's state type.
    #[error("failed to deserialize {what}: {source}")]
    #[diagnostic(
        code(threadvault::saver::deserialize_failed),
        help("Stored bytes do not match the expected shape for `{what}`.")
    )]
    DeserializeFailed {
        what: String,
        #[source]
        source: BackendCause,
    },

    /// Transient transport or storage failure.
    #[error("backend unavailable: {context}")]
    #[diagnostic(
        code(threadvault::saver::backend_unavailable),
        help("Check backend connectivity and permissions; the operation may be retried.")
    )]
    BackendUnavailable {
        context: String,
        #[source]
        source: Option<BackendCause>,
    },

    /// The storage schema could not be created at construction time.
    #[error("schema initialization failed: {context}")]
    #[diagnostic(
        code(threadvault::saver::schema_init_failed),
        help("The saver refused to construct; inspect the database and its permissions.")
    )]
    SchemaInitFailed {
        context: String,
        #[source]
        source: Option<BackendCause>,
    },
}

impl SaverError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// `NotFound` for a checkpoint address; `None` id means latest-of-scope.
    pub fn checkpoint_not_found(
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: Option<&str>,
    ) -> Self {
        Self::NotFound {
            locator: format!(
                "checkpoint `{}` (thread `{thread_id}`, ns `{checkpoint_ns}`)",
                checkpoint_id.unwrap_or("latest"),
            ),
        }
    }

    /// `NotFound` for a blob address.
    pub fn blob_not_found(
        thread_id: &str,
        checkpoint_ns: &str,
        channel: &str,
        version: &str,
    ) -> Self {
        Self::NotFound {
            locator: format!(
                "blob `{channel}@{version}` (thread `{thread_id}`, ns `{checkpoint_ns}`)"
            ),
        }
    }

    pub fn serialize(what: impl Into<String>, source: impl Into<BackendCause>) -> Self {
        Self::SerializeFailed {
            what: what.into(),
            source: source.into(),
        }
    }

    pub fn deserialize(what: impl Into<String>, source: impl Into<BackendCause>) -> Self {
        Self::DeserializeFailed {
            what: what.into(),
            source: source.into(),
        }
    }

    pub fn backend(context: impl Into<String>, source: impl Into<BackendCause>) -> Self {
        Self::BackendUnavailable {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    pub fn backend_message(context: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            context: context.into(),
            source: None,
        }
    }

    pub fn schema_init(context: impl Into<String>, source: impl Into<BackendCause>) -> Self {
        Self::SchemaInitFailed {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this kind is worth retrying at a higher layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Whether this kind means the addressed record is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type SaverResult<T> = std::result::Result<T, SaverError>;
