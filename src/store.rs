//! SQLite-backed dataset store.
//!
//! Holds exactly one generation of [`Record`]s at a time. `replace_all` is
//! the only mutation: it deletes the previous generation and inserts the new
//! one inside a single transaction, so concurrent readers observe either the
//! old complete dataset or the new one — never a mix or an empty gap. WAL
//! journal mode (set in [`crate::db`]) gives readers snapshot isolation
//! while a replace is in flight, and the write lock serializes replaces
//! with each other.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{IngestionMeta, Record};

/// Persistence fault surfaced by the store. No retry policy lives here —
/// callers report the failure and the previous dataset stays queryable.
#[derive(Debug)]
pub struct StoreError(sqlx::Error);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store fault: {}", self.0)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError(e)
    }
}

/// The current full collection of records, replaced wholesale on each
/// successful ingestion. Constructed once at startup and passed explicitly
/// to the ingestion pipeline and query service.
#[derive(Clone)]
pub struct DatasetStore {
    pool: SqlitePool,
}

impl DatasetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces the entire dataset with `records` in one transaction.
    ///
    /// An empty slice empties the store. On error the transaction rolls
    /// back and the previous generation remains intact.
    pub async fn replace_all(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records").execute(&mut *tx).await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, zone, document_number, full_name,
                                     canton_name, province_name, role, birth_date)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.zone)
            .bind(&record.document_number)
            .bind(&record.full_name)
            .bind(&record.canton_name)
            .bind(&record.province_name)
            .bind(&record.role)
            .bind(&record.birth_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All records whose document number equals `id` by exact string
    /// equality. An empty result is not an error.
    pub async fn query_by_document(&self, id: &str) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query(
            "SELECT zone, document_number, full_name, canton_name, province_name, role, birth_date
             FROM records WHERE document_number = ?",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Every stored record, order unspecified.
    pub async fn query_all(&self) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query(
            "SELECT zone, document_number, full_name, canton_name, province_name, role, birth_date
             FROM records",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Appends one provenance row for a committed replace.
    pub async fn log_ingestion(&self, meta: &IngestionMeta) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ingestions (id, filename, row_count, content_hash, ingested_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&meta.filename)
        .bind(meta.row_count)
        .bind(&meta.content_hash)
        .bind(meta.ingested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Provenance of the most recent successful ingestion, if any.
    pub async fn last_ingestion(&self) -> Result<Option<IngestionMeta>, StoreError> {
        let row = sqlx::query(
            "SELECT filename, row_count, content_hash, ingested_at
             FROM ingestions ORDER BY ingested_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| IngestionMeta {
            filename: r.get("filename"),
            row_count: r.get("row_count"),
            content_hash: r.get("content_hash"),
            ingested_at: r.get("ingested_at"),
        }))
    }
}

fn record_from_row(row: &SqliteRow) -> Record {
    Record {
        zone: row.get("zone"),
        document_number: row.get("document_number"),
        full_name: row.get("full_name"),
        canton_name: row.get("canton_name"),
        province_name: row.get("province_name"),
        role: row.get("role"),
        birth_date: row.get("birth_date"),
    }
}
