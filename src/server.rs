//! JSON HTTP API for uploads and queries.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/subir` | Upload a CSV roster; replaces the entire dataset |
//! | `GET`  | `/consultar` | Look up by `?cedula=<id>`, or dump all records |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "missing-column", "message": "required column ROLE is missing" } }
//! ```
//!
//! Upload failure codes: `unsupported-format` (400), `decode-error` (400),
//! `missing-column` (400), `store-error` (500); a malformed request (no
//! `file` field) is `bad_request` (400). Query codes: `not-found` (404) for
//! an id with no matches, `store-error` (500). A full dump of an empty
//! dataset is a valid `200 []`, not an error.
//!
//! Responses are UTF-8 JSON with non-ASCII text passed through verbatim —
//! accented names reach clients byte-for-byte as ingested.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::ingest::{self, IngestError};
use crate::models::Record;
use crate::query::{lookup, QueryOutcome};
use crate::store::DatasetStore;

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor. The store is the single injected dataset handle.
#[derive(Clone)]
struct AppState {
    store: DatasetStore,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and registers all
/// route handlers. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let state = AppState {
        store: DatasetStore::new(pool),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/subir", post(handle_upload))
        .route("/consultar", get(handle_query))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.ingest.max_upload_bytes))
        .layer(cors)
        .with_state(state);

    println!("padron listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"missing-column"`, `"not-found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error for malformed requests.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not-found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for persistence faults.
fn store_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "store-error".to_string(),
        message: message.into(),
    }
}

/// Maps a pipeline failure to its HTTP status and contract code. Everything
/// except a store fault is the client's upload, not the server.
fn ingest_error(e: IngestError) -> AppError {
    let status = match e {
        IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    AppError {
        status,
        code: e.code().to_string(),
        message: e.to_string(),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /subir ============

/// JSON response body for a successful upload.
#[derive(Serialize)]
struct UploadResponse {
    status: String,
    rows_ingested: usize,
    message: String,
}

/// Handler for `POST /subir`.
///
/// Expects a multipart request with a `file` field carrying a filename with
/// the accepted extension. The whole pipeline runs before anything becomes
/// visible: a failure at any step leaves the previous dataset serving.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| bad_request("file field must carry a filename"))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(e.to_string()))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| bad_request("request must include a 'file' field"))?;

    let summary = ingest::ingest_bytes(&state.store, &bytes, &filename)
        .await
        .map_err(ingest_error)?;

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        rows_ingested: summary.rows_ingested,
        message: format!("dataset replaced with {} rows", summary.rows_ingested),
    }))
}

// ============ GET /consultar ============

/// Query string for `GET /consultar`.
#[derive(Deserialize)]
struct QueryParams {
    /// Document number to look up. Absent (or empty) dumps the full dataset.
    cedula: Option<String>,
}

/// Handler for `GET /consultar`.
///
/// Returns matching records as a JSON array; the serialized field names are
/// the external contract and never change.
async fn handle_query(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Record>>, AppError> {
    let outcome = lookup(&state.store, params.cedula.as_deref())
        .await
        .map_err(|e| store_error(e.to_string()))?;

    match outcome {
        QueryOutcome::Records(records) => Ok(Json(records)),
        QueryOutcome::NotFound => Err(not_found(format!(
            "no records found for document number {}",
            params.cedula.unwrap_or_default()
        ))),
    }
}
