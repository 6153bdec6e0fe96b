//! Document-number lookup and full-dataset dump.
//!
//! The core lookup function returns structured data (used by both the CLI
//! and the HTTP server); the CLI wrapper prints records as pretty JSON.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::models::Record;
use crate::store::{DatasetStore, StoreError};

/// Result of a query: either the matching records or an explicit miss for a
/// specific document number.
///
/// A full dump of an empty dataset is `Records(vec![])` — valid and empty —
/// never `NotFound`; only an id-filtered lookup can miss.
#[derive(Debug)]
pub enum QueryOutcome {
    Records(Vec<Record>),
    NotFound,
}

/// Core lookup over an optional document id.
///
/// A present, non-empty id filters by exact string equality; anything else
/// returns the whole dataset.
pub async fn lookup(
    store: &DatasetStore,
    document_id: Option<&str>,
) -> Result<QueryOutcome, StoreError> {
    match document_id {
        Some(id) if !id.is_empty() => {
            let matches = store.query_by_document(id).await?;
            if matches.is_empty() {
                Ok(QueryOutcome::NotFound)
            } else {
                Ok(QueryOutcome::Records(matches))
            }
        }
        _ => Ok(QueryOutcome::Records(store.query_all().await?)),
    }
}

/// CLI entry point — prints matching records to stdout.
pub async fn run_query(config: &Config, document_id: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = DatasetStore::new(pool.clone());

    let outcome = lookup(&store, document_id).await?;
    pool.close().await;

    match outcome {
        QueryOutcome::Records(records) => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        QueryOutcome::NotFound => {
            eprintln!(
                "Error: no records found for document number {}",
                document_id.unwrap_or_default()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
