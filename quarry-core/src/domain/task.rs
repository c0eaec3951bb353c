//! Task queued for asynchronous stage execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::state::ExecutionState;

/// One unit of work targeting a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub state: ExecutionState,
    pub stage: String,
    pub payload: Map<String, Value>,
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    pub fn new(state: ExecutionState, stage: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            stage: stage.into(),
            payload,
            enqueued_at: Utc::now(),
        }
    }
}
