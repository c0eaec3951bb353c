//! Records owned by the storage collaborator
//!
//! The orchestrator reads last-run timestamps, enumerates stored results and
//! deletes tags and operations. It never writes any of these; stage execution
//! does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stage invocation recorded by stage execution
///
/// The latest `started_at` of a pipeline is its last-run timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub pipeline: String,
    pub stage: String,
    pub run_id: String,
    pub status: OperationStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Success,
    Failed,
}

/// Key/value marker set by stages, typically to skip already seen items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub pipeline: String,
    pub key: String,
    pub value: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Output of a stage, addressed to the stage that consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub pipeline: String,
    pub prev_stage: Option<String>,
    pub next_stage: String,
    pub payload: Map<String, Value>,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::Success => write!(f, "success"),
            OperationStatus::Failed => write!(f, "failed"),
        }
    }
}
