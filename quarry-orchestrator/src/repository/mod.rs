//! Repository layer
//!
//! Contracts for the storage collaborators the crawler reads from (last-run
//! timestamps, stored results) and deletes from (tags, operations). The
//! records are written by stage execution, never by the orchestrator.
//!
//! All repositories are trait-based so crawlers can run against Postgres or
//! the in-memory store used in tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use quarry_core::domain::record::StoredResult;

use crate::error::StorageError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Run-time metadata of pipelines: operations and tags
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Start time of the most recent operation of a pipeline
    ///
    /// Returns `None` if the pipeline never ran.
    async fn last_run(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Opens a transaction for deleting a pipeline's metadata
    async fn begin(&self) -> Result<Box<dyn FlushTransaction>, StorageError>;
}

/// Deletions that become visible together on commit
///
/// Dropping the transaction without committing discards the deletions.
#[async_trait]
pub trait FlushTransaction: Send {
    /// Deletes every tag of a pipeline, returning how many matched
    async fn delete_tags(&mut self, pipeline: &str) -> Result<u64, StorageError>;

    /// Deletes every operation of a pipeline, returning how many matched
    async fn delete_operations(&mut self, pipeline: &str) -> Result<u64, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

/// Stored stage outputs
pub trait ResultStore: Send + Sync {
    /// Lazily enumerates the results of `pipeline` addressed to `next_stage`
    ///
    /// The stream is forward-only and finite. Results written after it was
    /// opened may or may not be yielded.
    fn results_for<'a>(
        &'a self,
        pipeline: &'a str,
        next_stage: &'a str,
    ) -> BoxStream<'a, Result<StoredResult, StorageError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _assert_metadata(_: &dyn MetadataStore) {}
        fn _assert_transaction(_: &dyn FlushTransaction) {}
        fn _assert_results(_: &dyn ResultStore) {}
    }
}
