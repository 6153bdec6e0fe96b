//! Core data models used throughout padron.
//!
//! These types represent the person records that flow through the ingestion
//! pipeline and the provenance entries written alongside each replace.

use serde::{Deserialize, Serialize};

/// One person entry in the registry.
///
/// Internal field names are English; the serialized names are the external
/// API contract and must not change. `document_number` and `birth_date` are
/// text end to end — the document number keeps its leading zeros, and the
/// birth date round-trips whatever the source file contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub zone: String,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "apellidos_nombres")]
    pub full_name: String,
    #[serde(rename = "nombre_canton")]
    pub canton_name: String,
    #[serde(rename = "nombre_provincia")]
    pub province_name: String,
    #[serde(rename = "funcion")]
    pub role: String,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: String,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub rows_ingested: usize,
}

/// Provenance for one successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestionMeta {
    pub filename: String,
    pub row_count: i64,
    /// SHA-256 of the uploaded bytes, hex-encoded.
    pub content_hash: String,
    pub ingested_at: i64,
}
