//! In-memory storage
//!
//! Mirrors the Postgres tables with mutex-guarded vectors. Used by tests and
//! by embedders that don't need durable metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use quarry_core::domain::record::{OperationRecord, StoredResult, TagRecord};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FlushTransaction, MetadataStore, ResultStore};
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Records {
    operations: Vec<OperationRecord>,
    tags: Vec<TagRecord>,
    results: Vec<StoredResult>,
}

/// In-memory implementation of the metadata and result stores
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Records>>,
}

fn lock(records: &Mutex<Records>) -> Result<MutexGuard<'_, Records>, StorageError> {
    records.lock().map_err(|_| StorageError::LockPoisoned)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_operation(&self, operation: OperationRecord) -> Result<(), StorageError> {
        lock(&self.records)?.operations.push(operation);
        Ok(())
    }

    pub fn record_tag(&self, tag: TagRecord) -> Result<(), StorageError> {
        lock(&self.records)?.tags.push(tag);
        Ok(())
    }

    pub fn record_result(&self, result: StoredResult) -> Result<(), StorageError> {
        lock(&self.records)?.results.push(result);
        Ok(())
    }

    pub fn operation_count(&self, pipeline: &str) -> Result<usize, StorageError> {
        let records = lock(&self.records)?;
        Ok(records.operations.iter().filter(|o| o.pipeline == pipeline).count())
    }

    pub fn tag_count(&self, pipeline: &str) -> Result<usize, StorageError> {
        let records = lock(&self.records)?;
        Ok(records.tags.iter().filter(|t| t.pipeline == pipeline).count())
    }

    pub fn result_count(&self, pipeline: &str) -> Result<usize, StorageError> {
        let records = lock(&self.records)?;
        Ok(records.results.iter().filter(|r| r.pipeline == pipeline).count())
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn last_run(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let records = lock(&self.records)?;
        Ok(records
            .operations
            .iter()
            .filter(|o| o.pipeline == pipeline)
            .map(|o| o.started_at)
            .max())
    }

    async fn begin(&self) -> Result<Box<dyn FlushTransaction>, StorageError> {
        Ok(Box::new(MemoryFlush {
            records: Arc::clone(&self.records),
            tags: Vec::new(),
            operations: Vec::new(),
        }))
    }
}

impl ResultStore for MemoryStore {
    fn results_for<'a>(
        &'a self,
        pipeline: &'a str,
        next_stage: &'a str,
    ) -> BoxStream<'a, Result<StoredResult, StorageError>> {
        // Results are append-only, so rows at or past `end` were recorded
        // after the stream was opened and are not yielded.
        let end = match lock(&self.records) {
            Ok(records) => records.results.len(),
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        stream::unfold(Some(0), move |cursor| async move {
            let Some(mut index) = cursor else {
                return None;
            };
            let records = match lock(&self.records) {
                Ok(records) => records,
                Err(e) => return Some((Err(e), None)),
            };
            while index < end {
                let Some(row) = records.results.get(index) else {
                    return None;
                };
                index += 1;
                if row.pipeline == pipeline && row.next_stage == next_stage {
                    return Some((Ok(row.clone()), Some(index)));
                }
            }
            None
        })
        .boxed()
    }
}

/// Staged deletions, applied under one lock on commit
struct MemoryFlush {
    records: Arc<Mutex<Records>>,
    tags: Vec<String>,
    operations: Vec<String>,
}

#[async_trait]
impl FlushTransaction for MemoryFlush {
    async fn delete_tags(&mut self, pipeline: &str) -> Result<u64, StorageError> {
        let matched = lock(&self.records)?
            .tags
            .iter()
            .filter(|t| t.pipeline == pipeline)
            .count();
        self.tags.push(pipeline.to_string());
        Ok(matched as u64)
    }

    async fn delete_operations(&mut self, pipeline: &str) -> Result<u64, StorageError> {
        let matched = lock(&self.records)?
            .operations
            .iter()
            .filter(|o| o.pipeline == pipeline)
            .count();
        self.operations.push(pipeline.to_string());
        Ok(matched as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let mut records = lock(&self.records)?;
        records.tags.retain(|t| !self.tags.contains(&t.pipeline));
        records
            .operations
            .retain(|o| !self.operations.contains(&o.pipeline));
        Ok(())
    }
}
