//! Ingestion pipeline orchestration.
//!
//! Coordinates the full replace flow: extension policy → decode → per-row
//! mapping → atomic replace in the dataset store. Every validation and
//! mapping step runs before the store is touched, so a bad upload never
//! leaves the dataset half-replaced.

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::decode::{self, DecodeError, Table};
use crate::models::{IngestSummary, IngestionMeta, Record};
use crate::store::{DatasetStore, StoreError};

/// The accepted upload format. Anything else is rejected before decoding.
pub const ACCEPTED_EXTENSION: &str = ".csv";

const COL_ZONE: &str = "ZONE";
const COL_DOCUMENT_NUMBER: &str = "DOCUMENT_NUMBER";
const COL_FULL_NAME: &str = "FULL_NAME";
const COL_CANTON_NAME: &str = "CANTON_NAME";
const COL_PROVINCE_NAME: &str = "PROVINCE_NAME";
const COL_ROLE: &str = "ROLE";
const COL_BIRTH_DATE: &str = "BIRTH_DATE";

/// Why an ingestion was rejected. Nothing is committed on any of these.
#[derive(Debug)]
pub enum IngestError {
    /// The filename does not carry the accepted extension.
    UnsupportedFormat(String),
    Decode(DecodeError),
    /// A required column is absent from the header or from a row.
    MissingColumn(&'static str),
    Store(StoreError),
}

impl IngestError {
    /// Machine-readable status for this failure, part of the API contract.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFormat(_) => "unsupported-format",
            IngestError::Decode(_) => "decode-error",
            IngestError::MissingColumn(_) => "missing-column",
            IngestError::Store(_) => "store-error",
        }
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::UnsupportedFormat(filename) => write!(
                f,
                "unsupported upload '{}': only {} files are accepted",
                filename, ACCEPTED_EXTENSION
            ),
            IngestError::Decode(e) => write!(f, "{}", e),
            IngestError::MissingColumn(column) => {
                write!(f, "required column {} is missing", column)
            }
            IngestError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Decode(e) => Some(e),
            IngestError::Store(e) => Some(e),
            _ => None,
        }
    }
}

/// Whether a filename passes the upload format policy.
pub fn is_accepted(filename: &str) -> bool {
    filename.ends_with(ACCEPTED_EXTENSION)
}

/// Runs the full pipeline on uploaded bytes and replaces the dataset.
///
/// A zero-row upload still calls the replace and empties the store — an
/// empty file wipes the dataset, intentionally.
pub async fn ingest_bytes(
    store: &DatasetStore,
    bytes: &[u8],
    filename: &str,
) -> Result<IngestSummary, IngestError> {
    if !is_accepted(filename) {
        return Err(IngestError::UnsupportedFormat(filename.to_string()));
    }

    let table = decode::decode_csv(bytes).map_err(IngestError::Decode)?;
    let records = map_rows(&table)?;
    let rows_ingested = records.len();

    store.replace_all(&records).await.map_err(IngestError::Store)?;

    // Provenance is best-effort: a failure to log never fails the ingestion.
    let meta = IngestionMeta {
        filename: filename.to_string(),
        row_count: rows_ingested as i64,
        content_hash: fingerprint(bytes),
        ingested_at: Utc::now().timestamp(),
    };
    if let Err(e) = store.log_ingestion(&meta).await {
        eprintln!("warning: could not record ingestion provenance: {}", e);
    }

    Ok(IngestSummary { rows_ingested })
}

/// Maps every decoded row into a [`Record`], or fails the whole upload.
fn map_rows(table: &Table) -> Result<Vec<Record>, IngestError> {
    if table.rows().is_empty() {
        return Ok(Vec::new());
    }

    let col = |name: &'static str| table.column(name).ok_or(IngestError::MissingColumn(name));
    let zone = col(COL_ZONE)?;
    let document_number = col(COL_DOCUMENT_NUMBER)?;
    let full_name = col(COL_FULL_NAME)?;
    let canton_name = col(COL_CANTON_NAME)?;
    let province_name = col(COL_PROVINCE_NAME)?;
    let role = col(COL_ROLE)?;
    let birth_date = col(COL_BIRTH_DATE)?;

    let mut records = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        records.push(Record {
            zone: cell(row, zone, COL_ZONE)?,
            // The decoder hands every cell over as text, so taking the id
            // verbatim is the string-preservation guarantee: it has never
            // been through a numeric type.
            document_number: cell(row, document_number, COL_DOCUMENT_NUMBER)?,
            full_name: cell(row, full_name, COL_FULL_NAME)?,
            canton_name: cell(row, canton_name, COL_CANTON_NAME)?,
            province_name: cell(row, province_name, COL_PROVINCE_NAME)?,
            role: cell(row, role, COL_ROLE)?,
            birth_date: cell(row, birth_date, COL_BIRTH_DATE)?,
        });
    }
    Ok(records)
}

fn cell(row: &[String], idx: usize, name: &'static str) -> Result<String, IngestError> {
    row.get(idx).cloned().ok_or(IngestError::MissingColumn(name))
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// CLI entry point — ingests a local file and prints a summary.
pub async fn run_ingest(config: &Config, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read upload file: {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let pool = db::connect(config).await?;
    let store = DatasetStore::new(pool.clone());

    match ingest_bytes(&store, &bytes, &filename).await {
        Ok(summary) => {
            println!("ingest {}", filename);
            println!("  rows ingested: {}", summary.rows_ingested);
            println!("ok");
        }
        Err(e) => {
            pool.close().await;
            eprintln!("Error ({}): {}", e.code(), e);
            std::process::exit(1);
        }
    }

    pool.close().await;
    Ok(())
}
