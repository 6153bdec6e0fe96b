//! # padron CLI
//!
//! The `padron` binary is the primary interface for the registry. It
//! provides commands for database initialization, dataset ingestion,
//! lookups, statistics, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! padron --config ./config/padron.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `padron init` | Create the SQLite database and run schema migrations |
//! | `padron ingest <file>` | Replace the dataset with a CSV roster |
//! | `padron query [document]` | Look up by document number, or dump all |
//! | `padron stats` | Record count, db size, last-ingestion provenance |
//! | `padron serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! padron init --config ./config/padron.toml
//!
//! # Replace the dataset with a new roster
//! padron ingest roster.csv --config ./config/padron.toml
//!
//! # Exact lookup — leading zeros matter
//! padron query 0102030405 --config ./config/padron.toml
//!
//! # Start the HTTP server
//! padron serve --config ./config/padron.toml
//! ```

mod config;
mod db;
mod decode;
mod ingest;
mod migrate;
mod models;
mod query;
mod server;
mod stats;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// padron CLI — a CSV-ingestion personnel registry with atomic dataset
/// replacement.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/padron.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "padron",
    about = "padron — a CSV-ingestion personnel registry with atomic dataset replacement",
    version,
    long_about = "padron ingests a tabular roster of person records keyed by a national \
    document number. Each upload wholesale replaces the stored dataset in a single \
    transaction, and lookups are served from SQLite over a JSON HTTP API and this CLI."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/padron.toml`. Database, server, and ingestion
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/padron.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (records,
    /// ingestions). This command is idempotent — running it multiple times
    /// is safe.
    Init,

    /// Replace the dataset with a tabular file.
    ///
    /// Validates the extension, decodes every row, and commits the
    /// replacement in one transaction. A failed ingestion leaves the
    /// previous dataset fully intact.
    Ingest {
        /// Path to the roster file (`.csv`).
        file: PathBuf,
    },

    /// Query records by document number, or dump the full dataset.
    ///
    /// Matching is exact string equality — `0102030405` and `102030405`
    /// are different identifiers.
    Query {
        /// Document number to look up. Omit to print every record.
        document: Option<String>,
    },

    /// Show record counts and last-ingestion provenance.
    Stats,

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload and query endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            ingest::run_ingest(&cfg, &file).await?;
        }
        Commands::Query { document } => {
            query::run_query(&cfg, document.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
