use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Creates the tables written by stage execution and read by crawlers
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // One row per stage invocation
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id BIGSERIAL PRIMARY KEY,
            pipeline VARCHAR(255) NOT NULL,
            stage VARCHAR(255) NOT NULL,
            run_id VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            started_at TIMESTAMPTZ NOT NULL,
            ended_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id BIGSERIAL PRIMARY KEY,
            pipeline VARCHAR(255) NOT NULL,
            key TEXT NOT NULL,
            value JSONB,
            timestamp TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Stage outputs, addressed to the stage that consumes them
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            id BIGSERIAL PRIMARY KEY,
            pipeline VARCHAR(255) NOT NULL,
            prev_stage VARCHAR(255),
            next_stage VARCHAR(255) NOT NULL,
            payload JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_operations_pipeline ON operations(pipeline, started_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tags_pipeline ON tags(pipeline, key)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_results_pipeline_next ON results(pipeline, next_stage, id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
