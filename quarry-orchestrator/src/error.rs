//! Error types for the orchestrator
//!
//! Every operation fails fast: nothing is retried or recovered here, errors
//! propagate to the immediate caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Errors surfaced by crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The pipeline definition is malformed
    #[error("Invalid pipeline definition: {0}")]
    Config(#[from] ConfigError),

    /// A run or replay referenced a stage the pipeline doesn't define
    #[error("Pipeline '{pipeline}' has no stage '{stage}'")]
    UnknownStage {
        /// Pipeline name
        pipeline: String,
        /// Stage that could not be resolved
        stage: String,
    },

    /// The task queue transport rejected an enqueue
    #[error("Dispatch unavailable: {0}")]
    DispatchUnavailable(#[from] DispatchError),

    /// A storage collaborator failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

impl CrawlError {
    pub fn unknown_stage(pipeline: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::UnknownStage {
            pipeline: pipeline.into(),
            stage: stage.into(),
        }
    }

    /// Check if this error came from the entry or replay stage lookup
    pub fn is_unknown_stage(&self) -> bool {
        matches!(self, Self::UnknownStage { .. })
    }
}

/// Errors raised while loading pipeline definitions
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The definition file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The definition is not valid YAML or has mistyped fields
    #[error("Failed to parse definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A definition file failed to parse
    #[error("Failed to parse {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Semantically invalid definition
    #[error("{0}")]
    Invalid(String),

    /// Two definitions resolved to the same pipeline name
    #[error("Duplicate pipeline name: {0}")]
    DuplicatePipeline(String),
}

/// Errors raised by the task queue transport
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The transport is not accepting tasks
    #[error("task queue unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the storage collaborators
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal mutex was poisoned by a panicked thread
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A stored row could not be decoded
    #[error("failed to decode stored record: {0}")]
    Decode(String),
}
