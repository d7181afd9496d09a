//! Error types for delta application
//!
//! Two classes of failure:
//! - Fatal ([`DeltaError`]): propagated to the caller, who should discard the
//!   view and reload from a fresh snapshot
//! - Recoverable ([`ApplicationError`]): contained within the batch, logged
//!   and handed to the alert sink

use flowview_model::{EntityKind, NormalizeError};
use flowview_store::StoreError;
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::PathBuf;

/// Fatal batch failure
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Batch or store reference absent
    #[error("malformed batch: {0}")]
    MalformedBatch(&'static str),

    /// Initial snapshot could not be ingested; the store was left empty
    #[error("initial ingestion failed: {0}")]
    InitialIngestion(#[from] IngestionError),
}

impl DeltaError {
    /// Check if the caller has to reload from a fresh snapshot
    #[inline]
    #[must_use]
    pub fn requires_reload(&self) -> bool {
        matches!(self, Self::InitialIngestion(_))
    }
}

/// Why an initial snapshot was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestionError {
    /// Workflow record itself is malformed
    #[error("invalid workflow record: {0}")]
    Workflow(NormalizeError),

    /// Store refused the workflow root
    #[error("workflow root rejected: {0}")]
    Root(StoreError),

    /// One of the snapshot's entities could not be inserted
    #[error(transparent)]
    Item(#[from] ItemApplicationError),
}

/// Batch arrived before the initial snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "received delta batch {} before the workflow initial data burst",
    .batch_id.as_deref().unwrap_or("<unnamed>")
)]
pub struct OutOfOrderDeltaError {
    /// Upstream id of the discarded batch
    pub batch_id: Option<String>,
}

impl OutOfOrderDeltaError {
    /// Create out of order error for a batch
    #[inline]
    #[must_use]
    pub fn new(batch_id: Option<String>) -> Self {
        Self { batch_id }
    }
}

/// Section of a batch an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaPhase {
    /// Initial snapshot
    Initial,
    Pruned,
    Added,
    Updated,
}

impl fmt::Display for DeltaPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Pruned => "pruned",
            Self::Added => "added",
            Self::Updated => "updated",
        };
        f.write_str(name)
    }
}

/// Underlying cause of an item failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemFailure {
    /// Record could not be turned into a node
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Store rejected the node
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One item of a batch that could not be applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "{phase} {kind} '{}': {source}",
    .id.as_deref().unwrap_or("<no id>")
)]
pub struct ItemApplicationError {
    pub phase: DeltaPhase,
    pub kind: EntityKind,
    /// Item id, when the record carried a readable one
    pub id: Option<String>,
    pub source: ItemFailure,
}

impl ItemApplicationError {
    /// Failure of a raw record
    #[must_use]
    pub fn for_record(
        phase: DeltaPhase,
        kind: EntityKind,
        raw: &JsonValue,
        source: impl Into<ItemFailure>,
    ) -> Self {
        Self {
            phase,
            kind,
            id: raw.get("id").and_then(JsonValue::as_str).map(str::to_string),
            source: source.into(),
        }
    }

    /// Failure of a pruned id
    #[must_use]
    pub fn for_id(
        phase: DeltaPhase,
        kind: EntityKind,
        id: &str,
        source: impl Into<ItemFailure>,
    ) -> Self {
        Self {
            phase,
            kind,
            id: Some(id.to_string()),
            source: source.into(),
        }
    }
}

/// Recoverable failure, as delivered to the alert sink
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    OutOfOrder(#[from] OutOfOrderDeltaError),

    #[error(transparent)]
    Item(#[from] ItemApplicationError),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File is not valid TOML for this config
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
