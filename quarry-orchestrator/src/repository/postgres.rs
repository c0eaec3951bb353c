//! Postgres storage
//!
//! Reads and deletes the tables created by `db::run_migrations`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use quarry_core::domain::record::StoredResult;
use sqlx::{PgPool, Postgres, Transaction};

use super::{FlushTransaction, MetadataStore, ResultStore};
use crate::db;
use crate::error::StorageError;

/// Postgres implementation of the metadata and result stores
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and ensures the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = db::create_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

}

#[async_trait]
impl MetadataStore for PgStore {
    async fn last_run(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let last_run = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(started_at) FROM operations WHERE pipeline = $1",
        )
        .bind(pipeline)
        .fetch_one(&self.pool)
        .await?;

        Ok(last_run)
    }

    async fn begin(&self) -> Result<Box<dyn FlushTransaction>, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgFlush { tx }))
    }
}

impl ResultStore for PgStore {
    fn results_for<'a>(
        &'a self,
        pipeline: &'a str,
        next_stage: &'a str,
    ) -> BoxStream<'a, Result<StoredResult, StorageError>> {
        sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT pipeline, prev_stage, next_stage, payload
            FROM results
            WHERE pipeline = $1 AND next_stage = $2
            ORDER BY id ASC
            "#,
        )
        .bind(pipeline)
        .bind(next_stage)
        .fetch(&self.pool)
        .map(|row| row.map_err(StorageError::from).and_then(StoredResult::try_from))
        .boxed()
    }
}

/// Flush over a single database transaction
struct PgFlush {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FlushTransaction for PgFlush {
    async fn delete_tags(&mut self, pipeline: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM tags WHERE pipeline = $1")
            .bind(pipeline)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_operations(&mut self, pipeline: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM operations WHERE pipeline = $1")
            .bind(pipeline)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ResultRow {
    pipeline: String,
    prev_stage: Option<String>,
    next_stage: String,
    payload: serde_json::Value,
}

impl TryFrom<ResultRow> for StoredResult {
    type Error = StorageError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let payload = match row.payload {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(StorageError::Decode(format!(
                    "result payload must be an object, got {}",
                    other
                )));
            }
        };

        Ok(StoredResult {
            pipeline: row.pipeline,
            prev_stage: row.prev_stage,
            next_stage: row.next_stage,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(payload: serde_json::Value) -> ResultRow {
        ResultRow {
            pipeline: "gazette".to_string(),
            prev_stage: Some("fetch".to_string()),
            next_stage: "parse".to_string(),
            payload,
        }
    }

    #[test]
    fn test_row_conversion() {
        let result = StoredResult::try_from(row(json!({ "url": "https://example.com" }))).unwrap();
        assert_eq!(result.next_stage, "parse");
        assert_eq!(result.payload["url"], json!("https://example.com"));
    }

    #[test]
    fn test_null_payload_is_empty() {
        let result = StoredResult::try_from(row(serde_json::Value::Null)).unwrap();
        assert!(result.payload.is_empty());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let result = StoredResult::try_from(row(json!([1, 2])));
        assert!(matches!(result, Err(StorageError::Decode(_))));
    }
}
