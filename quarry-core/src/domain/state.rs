//! Execution state carried by every dispatched task

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State passed along with a task to the stage execution collaborator
///
/// Serializes flat: caller-supplied keys sit next to `pipeline_name` and
/// `incremental`. Created fresh for each run or replayed item and never
/// modified once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub pipeline_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionState {
    /// State for a fresh run of a pipeline
    pub fn for_run(pipeline_name: impl Into<String>, incremental: bool) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            incremental: Some(incremental),
            extra: Map::new(),
        }
    }

    /// Minimal state used when replaying stored results
    pub fn for_replay(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            incremental: None,
            extra: Map::new(),
        }
    }

    /// Adds caller-supplied keys
    ///
    /// Keys that collide with `pipeline_name` or `incremental` are dropped.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        for (key, value) in extra {
            if key == "pipeline_name" || key == "incremental" {
                continue;
            }
            self.extra.insert(key, value);
        }
        self
    }
}
