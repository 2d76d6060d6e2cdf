//! Addressing configuration for saver operations.
//!
//! A [`CheckpointConfig`] names where an operation should look: which thread,
//! which namespace within the thread, and optionally which exact checkpoint.
//! An absent checkpoint ID means "latest". Validation happens at call sites
//! (the savers), not at construction, so configs stay cheap to build and
//! pass around.

use crate::checkpoint::MetadataMap;
use crate::savers::errors::{SaverError, SaverResult};
use serde_json::Value;

/// Addressing triple `(thread, namespace, id?)` plus caller metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointConfig {
    /// Thread identifier. Must be non-empty at call time.
    pub thread_id: String,
    /// Namespace within the thread; empty string is the default namespace.
    /// A leading `"."` is part of the name, not a separator.
    pub checkpoint_ns: String,
    /// Exact checkpoint to address; `None` targets the latest.
    pub checkpoint_id: Option<String>,
    /// Caller metadata merged into checkpoints the manager creates.
    pub metadata: MetadataMap,
}

impl CheckpointConfig {
    /// Config addressing the latest checkpoint of `thread_id` in the default
    /// namespace.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Self::default()
        }
    }

    /// Address a namespace within the thread.
    #[must_use]
    pub fn with_namespace(mut self, checkpoint_ns: impl Into<String>) -> Self {
        self.checkpoint_ns = checkpoint_ns.into();
        self
    }

    /// Address one exact checkpoint instead of the latest.
    #[must_use]
    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this config names one exact checkpoint.
    pub fn is_exact(&self) -> bool {
        self.checkpoint_id.is_some()
    }

    /// Check the invariants every saver operation relies on.
    pub fn validate(&self) -> SaverResult<()> {
        if self.thread_id.is_empty() {
            return Err(SaverError::invalid_config("thread_id must not be empty"));
        }
        if let Some(id) = &self.checkpoint_id
            && id.is_empty()
        {
            return Err(SaverError::invalid_config(
                "checkpoint_id must not be empty when set; omit it to address the latest",
            ));
        }
        Ok(())
    }

    /// Validate and require an exact checkpoint ID (delete and friends).
    pub fn require_checkpoint_id(&self) -> SaverResult<&str> {
        self.validate()?;
        self.checkpoint_id.as_deref().ok_or_else(|| {
            SaverError::invalid_config("operation requires an explicit checkpoint_id")
        })
    }
}

impl std::fmt::Display for CheckpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.thread_id)?;
        if !self.checkpoint_ns.is_empty() {
            write!(f, ":{}", self.checkpoint_ns)?;
        }
        match &self.checkpoint_id {
            Some(id) => write!(f, "@{id}"),
            None => write!(f, "@latest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_chains() {
        let config = CheckpointConfig::new("t1")
            .with_namespace("sub")
            .with_checkpoint_id("cp-1")
            .with_metadata("description", json!("before retry"));
        assert_eq!(config.thread_id, "t1");
        assert_eq!(config.checkpoint_ns, "sub");
        assert!(config.is_exact());
        assert_eq!(config.metadata["description"], json!("before retry"));
    }

    #[test]
    fn empty_thread_is_rejected() {
        let config = CheckpointConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(SaverError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn latest_selector_cannot_be_deleted() {
        let config = CheckpointConfig::new("t1");
        assert!(matches!(
            config.require_checkpoint_id(),
            Err(SaverError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn display_formats_latest_and_exact() {
        assert_eq!(CheckpointConfig::new("t1").to_string(), "t1@latest");
        assert_eq!(
            CheckpointConfig::new("t1")
                .with_namespace("sub")
                .with_checkpoint_id("cp-9")
                .to_string(),
            "t1:sub@cp-9"
        );
    }
}
