//! Quarry Orchestrator
//!
//! Drives crawler pipelines: decides when a pipeline is due, turns a run
//! request into its first queued task, replays stored results back into a
//! stage and clears a pipeline's run-time metadata. Stage execution happens
//! in workers behind the task queue.

pub mod config;
pub mod crawler;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod manager;
pub mod queue;
pub mod repository;
pub mod schedule;

pub use config::OrchestratorConfig;
pub use crawler::{Backends, Crawler};
pub use dispatch::{Dispatcher, QueueDispatcher};
pub use error::{ConfigError, CrawlError, DispatchError, Result, StorageError};
pub use graph::{PipelineGraph, Stage};
pub use manager::Manager;
pub use queue::{MemoryQueue, TaskQueue};
pub use repository::{FlushTransaction, MemoryStore, MetadataStore, PgStore, ResultStore};
pub use schedule::Schedule;
