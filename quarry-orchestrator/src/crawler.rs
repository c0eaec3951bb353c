//! Crawler
//!
//! A crawler is one pipeline definition bound to the collaborators it needs:
//! it answers whether the pipeline is due, queues its entry stage, replays
//! stored results into a stage and flushes its run-time metadata. It never
//! executes stage logic itself.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use quarry_core::domain::pipeline::PipelineDefinition;
use quarry_core::domain::schedule::SchedulePolicy;
use quarry_core::domain::state::ExecutionState;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::dispatch::{Dispatcher, QueueDispatcher};
use crate::error::{ConfigError, CrawlError, Result};
use crate::graph::{PipelineGraph, Stage};
use crate::queue::TaskQueue;
use crate::repository::{MetadataStore, ResultStore};
use crate::schedule::Schedule;

/// Collaborators shared by every crawler of a process
#[derive(Clone)]
pub struct Backends {
    pub dispatcher: Arc<dyn Dispatcher>,
    pub queue: Arc<dyn TaskQueue>,
    pub metadata: Arc<dyn MetadataStore>,
    pub results: Arc<dyn ResultStore>,
}

impl Backends {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        queue: Arc<dyn TaskQueue>,
        metadata: Arc<dyn MetadataStore>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            dispatcher,
            queue,
            metadata,
            results,
        }
    }

    /// Dispatches through `queue` and keeps metadata and results in `store`
    pub fn with_queue<Q, S>(queue: Arc<Q>, store: S) -> Self
    where
        Q: TaskQueue + 'static,
        S: MetadataStore + ResultStore + Clone + 'static,
    {
        let queue: Arc<dyn TaskQueue> = queue;
        Self {
            dispatcher: Arc::new(QueueDispatcher::new(Arc::clone(&queue))),
            queue,
            metadata: Arc::new(store.clone()),
            results: Arc::new(store),
        }
    }
}

/// A processing graph that constitutes a crawler
pub struct Crawler {
    name: String,
    description: String,
    category: String,
    schedule: Schedule,
    init_stage: String,
    delay: u64,
    expire: u64,
    stealthy: bool,
    graph: PipelineGraph,
    config: Arc<OrchestratorConfig>,
    backends: Backends,
}

impl Crawler {
    /// Builds a crawler from a parsed definition
    ///
    /// `identifier` names the pipeline when the definition has no `name`.
    /// A missing entry stage is not an error here; it is reported when the
    /// crawler is run.
    pub fn new(
        identifier: &str,
        definition: PipelineDefinition,
        config: Arc<OrchestratorConfig>,
        backends: Backends,
    ) -> std::result::Result<Self, ConfigError> {
        let name = definition.name.unwrap_or_else(|| identifier.to_string());
        if name.is_empty() {
            return Err(ConfigError::Invalid(
                "Pipeline name cannot be empty".to_string(),
            ));
        }
        if name.trim() != name {
            return Err(ConfigError::Invalid(format!(
                "Pipeline name '{}' has surrounding whitespace",
                name
            )));
        }

        let policy = SchedulePolicy::from_token(definition.schedule.as_deref());
        if policy == SchedulePolicy::None {
            if let Some(token) = &definition.schedule {
                debug!(pipeline = %name, "Schedule '{}' is not recognized, never due", token);
            }
        }

        let graph = PipelineGraph::new(definition.stages);
        for (stage, target) in graph.dangling_routes() {
            warn!(
                pipeline = %name,
                "Stage '{}' routes to undefined stage '{}'",
                stage, target
            );
        }

        Ok(Self {
            description: definition.description.unwrap_or_else(|| name.clone()),
            category: definition.category,
            schedule: Schedule::new(policy, definition.disabled),
            init_stage: definition.init_stage,
            delay: definition.delay,
            expire: definition.expire.unwrap_or(config.expire),
            stealthy: definition.stealthy,
            name,
            graph,
            config,
            backends,
        })
    }

    /// Parses a YAML definition document and builds a crawler from it
    pub fn from_yaml(
        identifier: &str,
        yaml: &str,
        config: Arc<OrchestratorConfig>,
        backends: Backends,
    ) -> std::result::Result<Self, ConfigError> {
        let definition: PipelineDefinition = serde_yaml::from_str(yaml)?;
        Self::new(identifier, definition, config, backends)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn disabled(&self) -> bool {
        self.schedule.disabled
    }

    pub fn init_stage(&self) -> &str {
        &self.init_stage
    }

    /// Seconds
    pub fn delay(&self) -> u64 {
        self.delay
    }

    /// Seconds
    pub fn expire(&self) -> u64 {
        self.expire
    }

    pub fn stealthy(&self) -> bool {
        self.stealthy
    }

    pub fn get(&self, stage: &str) -> Option<&Stage> {
        self.graph.get(stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.graph.iter()
    }

    /// Whether the last run is older than the scheduled interval
    pub async fn check_due(&self) -> Result<bool> {
        self.is_due_at(Utc::now()).await
    }

    /// Same as [`Crawler::check_due`] with an explicit clock
    ///
    /// The last-run timestamp is only fetched when the schedule can trigger.
    pub async fn is_due_at(&self, now: DateTime<Utc>) -> Result<bool> {
        if !self.schedule.is_active() {
            return Ok(false);
        }
        let last_run = self.backends.metadata.last_run(&self.name).await?;
        Ok(self.schedule.is_due(last_run, now))
    }

    /// Queues the execution of this crawler
    ///
    /// `incremental` defaults to the configured flag. Returns once the entry
    /// task is enqueued; in synchronous mode, once the queue has drained.
    pub async fn run(&self, incremental: Option<bool>) -> Result<()> {
        self.run_with(incremental, Map::new()).await
    }

    /// Like [`Crawler::run`], passing extra keys along in the execution state
    pub async fn run_with(
        &self,
        incremental: Option<bool>,
        extra: Map<String, Value>,
    ) -> Result<()> {
        let incremental = incremental.unwrap_or(self.config.incremental);
        let state = ExecutionState::for_run(&self.name, incremental).with_extra(extra);

        let stage = self
            .graph
            .get(&self.init_stage)
            .ok_or_else(|| CrawlError::unknown_stage(&self.name, &self.init_stage))?;

        self.backends
            .dispatcher
            .dispatch(state, &stage.name, Map::new())
            .await?;

        info!(
            pipeline = %self.name,
            stage = %stage.name,
            incremental,
            "Crawler run queued"
        );

        if self.config.sync {
            debug!(pipeline = %self.name, "Waiting for task queue to drain");
            self.backends
                .queue
                .wait_drained(self.config.drain_poll_interval)
                .await?;
            info!(pipeline = %self.name, "Task queue drained");
        }

        Ok(())
    }

    /// Re-queues every stored result addressed to `stage`
    ///
    /// Usually used to re-parse crawled documents after changing a parser.
    /// The stage must tolerate seeing the same payload twice. Returns the
    /// number of tasks dispatched.
    pub async fn replay(&self, stage: &str) -> Result<usize> {
        if !self.graph.contains(stage) {
            return Err(CrawlError::unknown_stage(&self.name, stage));
        }

        let mut results = self.backends.results.results_for(&self.name, stage);
        let mut dispatched = 0;

        while let Some(result) = results.try_next().await? {
            let state = ExecutionState::for_replay(&self.name);
            self.backends
                .dispatcher
                .dispatch(state, stage, result.payload)
                .await?;
            dispatched += 1;
        }

        info!(
            pipeline = %self.name,
            stage,
            dispatched,
            "Replayed stored results"
        );

        Ok(dispatched)
    }

    /// Deletes all run-time data generated by this crawler
    ///
    /// Tags and operations go in one transaction. Stored results and tasks
    /// already queued are left alone.
    pub async fn flush(&self) -> Result<()> {
        let mut tx = self.backends.metadata.begin().await?;
        let tags = tx.delete_tags(&self.name).await?;
        let operations = tx.delete_operations(&self.name).await?;
        tx.commit().await?;

        info!(
            pipeline = %self.name,
            tags,
            operations,
            "Flushed crawler metadata"
        );

        Ok(())
    }
}

impl std::fmt::Display for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Crawler({})", self.name)
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("init_stage", &self.init_stage)
            .field("stages", &self.graph.len())
            .finish()
    }
}
