//! Task dispatch
//!
//! The dispatcher is the only path from the orchestrator into asynchronous
//! execution. Each call enqueues exactly one task and returns without waiting
//! for it; retries, if any, are the transport's business.

use async_trait::async_trait;
use quarry_core::domain::state::ExecutionState;
use quarry_core::domain::task::Task;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::DispatchError;
use crate::queue::TaskQueue;

/// Hands `(state, stage, payload)` to the task queue
///
/// Implementations must tolerate concurrent callers. No ordering is promised
/// between two dispatches.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        state: ExecutionState,
        stage: &str,
        payload: Map<String, Value>,
    ) -> Result<(), DispatchError>;
}

/// Dispatcher that wraps each call into a [`Task`] and pushes it to a queue
#[derive(Clone)]
pub struct QueueDispatcher {
    queue: Arc<dyn TaskQueue>,
}

impl QueueDispatcher {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Dispatcher for QueueDispatcher {
    async fn dispatch(
        &self,
        state: ExecutionState,
        stage: &str,
        payload: Map<String, Value>,
    ) -> Result<(), DispatchError> {
        let task = Task::new(state, stage, payload);
        debug!(
            task_id = %task.id,
            pipeline = %task.state.pipeline_name,
            stage = %task.stage,
            "Dispatching task"
        );
        self.queue.push(task).await
    }
}

/// Dispatcher that records every call, for tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    calls: std::sync::Mutex<Vec<(ExecutionState, String, Map<String, Value>)>>,
}

#[cfg(test)]
impl RecordingDispatcher {
    pub(crate) fn calls(&self) -> Vec<(ExecutionState, String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        state: ExecutionState,
        stage: &str,
        payload: Map<String, Value>,
    ) -> Result<(), DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push((state, stage.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_enqueues_one_task() {
        let queue = Arc::new(MemoryQueue::new());
        let dispatcher = QueueDispatcher::new(queue.clone());

        let mut payload = Map::new();
        payload.insert("url".to_string(), json!("https://example.com"));
        dispatcher
            .dispatch(ExecutionState::for_run("gazette", true), "fetch", payload.clone())
            .await
            .unwrap();

        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].stage, "fetch");
        assert_eq!(pending[0].state.pipeline_name, "gazette");
        assert_eq!(pending[0].payload, payload);
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_are_independent() {
        let queue = Arc::new(MemoryQueue::new());
        let dispatcher = Arc::new(QueueDispatcher::new(queue.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(ExecutionState::for_replay("gazette"), "parse", Map::new())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 16);
        let ids: std::collections::HashSet<_> = pending.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let queue = Arc::new(MemoryQueue::new());
        queue.close().unwrap();
        let dispatcher = QueueDispatcher::new(queue);

        let result = dispatcher
            .dispatch(ExecutionState::for_replay("gazette"), "parse", Map::new())
            .await;
        assert!(matches!(result, Err(DispatchError::Unavailable(_))));
    }
}
