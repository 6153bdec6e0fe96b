//! Tabular decoding for uploaded datasets.
//!
//! Wraps the `csv` reader behind a small boundary: bytes in, header-tagged
//! rows out. Every cell is decoded as text — no column ever passes through a
//! numeric type, so identifier columns keep their leading zeros exactly as
//! they appear in the source file.

use csv::ReaderBuilder;

/// Maximum data rows decoded from a single upload (avoids unbounded memory).
const MAX_ROWS: usize = 1_000_000;

/// Decoding error (no panic; the pipeline reports it and leaves the store
/// untouched).
#[derive(Debug)]
pub enum DecodeError {
    /// The bytes could not be parsed as CSV (invalid UTF-8, ragged rows, …).
    Malformed(String),
    TooManyRows(usize),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(e) => write!(f, "malformed CSV content: {}", e),
            DecodeError::TooManyRows(max) => {
                write!(f, "upload exceeds row limit ({} rows)", max)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A decoded tabular file: one header row plus data rows, all text.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of a named column in the header row, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// Decodes CSV bytes into a [`Table`]. The first row is the header; an input
/// with no rows at all decodes to an empty table.
pub fn decode_csv(bytes: &[u8]) -> Result<Table, DecodeError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if rows.len() >= MAX_ROWS {
            return Err(DecodeError::TooManyRows(MAX_ROWS));
        }
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(Table { headers, rows })
}
