//! Task queue boundary
//!
//! The queue transport and its workers live outside the orchestrator. This
//! module defines the contract the orchestrator needs from them (enqueue and
//! drain detection) and an in-process implementation used for synchronous
//! runs and tests.

use async_trait::async_trait;
use quarry_core::domain::task::Task;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use crate::error::DispatchError;

/// Contract of the asynchronous execution substrate
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a task without waiting for it to execute
    async fn push(&self, task: Task) -> Result<(), DispatchError>;

    /// Whether no task is queued or executing
    async fn is_drained(&self) -> Result<bool, DispatchError>;

    /// Waits until the queue is drained
    ///
    /// The default polls `is_drained`, sleeping `poll_interval` between
    /// checks. There is no timeout: callers that need a bound wrap this in
    /// `tokio::time::timeout`.
    async fn wait_drained(&self, poll_interval: Duration) -> Result<(), DispatchError> {
        loop {
            if self.is_drained().await? {
                return Ok(());
            }
            debug!("Task queue not drained, checking again in {:?}", poll_interval);
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// In-process FIFO queue
///
/// Workers take tasks with [`MemoryQueue::pop`] and report them finished with
/// [`MemoryQueue::complete`]. The queue is drained once nothing is queued and
/// nothing taken is still unfinished; waiters are notified at that point
/// instead of polling.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    drained: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Task>,
    in_flight: HashSet<Uuid>,
    closed: bool,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, QueueState>, DispatchError> {
        self.state
            .lock()
            .map_err(|_| DispatchError::Unavailable("queue lock poisoned".to_string()))
    }

    /// Takes the oldest queued task and marks it in flight
    pub fn pop(&self) -> Result<Option<Task>, DispatchError> {
        let mut state = self.lock_state()?;
        let task = state.pending.pop_front();
        if let Some(task) = &task {
            state.in_flight.insert(task.id);
        }
        Ok(task)
    }

    /// Marks an in-flight task finished
    ///
    /// Returns false if the task was not in flight.
    pub fn complete(&self, task_id: Uuid) -> Result<bool, DispatchError> {
        let mut state = self.lock_state()?;
        let removed = state.in_flight.remove(&task_id);
        if removed && state.is_drained() {
            self.drained.notify_waiters();
        }
        Ok(removed)
    }

    /// Stops accepting tasks; later pushes fail with `Unavailable`
    pub fn close(&self) -> Result<(), DispatchError> {
        self.lock_state()?.closed = true;
        Ok(())
    }

    /// Number of queued tasks, excluding in-flight ones
    pub fn len(&self) -> Result<usize, DispatchError> {
        Ok(self.lock_state()?.pending.len())
    }

    pub fn is_empty(&self) -> Result<bool, DispatchError> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of the queued tasks in FIFO order
    pub fn pending(&self) -> Result<Vec<Task>, DispatchError> {
        Ok(self.lock_state()?.pending.iter().cloned().collect())
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn push(&self, task: Task) -> Result<(), DispatchError> {
        let mut state = self.lock_state()?;
        if state.closed {
            return Err(DispatchError::Unavailable("queue is closed".to_string()));
        }
        debug!("Queued task {} for stage '{}'", task.id, task.stage);
        state.pending.push_back(task);
        Ok(())
    }

    async fn is_drained(&self) -> Result<bool, DispatchError> {
        Ok(self.lock_state()?.is_drained())
    }

    async fn wait_drained(&self, _poll_interval: Duration) -> Result<(), DispatchError> {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between isn't missed.
            notified.as_mut().enable();

            let drained = self.lock_state()?.is_drained();
            if drained {
                return Ok(());
            }
            notified.await;
        }
    }
}
