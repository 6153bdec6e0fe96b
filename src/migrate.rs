use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create records table. Every person field is TEXT — document numbers
    // and birth dates are stored verbatim, never as typed columns.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            zone TEXT NOT NULL,
            document_number TEXT NOT NULL,
            full_name TEXT NOT NULL,
            canton_name TEXT NOT NULL,
            province_name TEXT NOT NULL,
            role TEXT NOT NULL,
            birth_date TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create ingestions provenance table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingestions (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_document_number ON records(document_number)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingestions_ingested_at ON ingestions(ingested_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
