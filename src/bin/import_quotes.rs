// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk-load quotes from a `content,author` CSV into Postgres.

use anyhow::Context;
use clap::Parser;
use peace::{
    config::database_url_from_env,
    db::PgStore,
    services::importer::{import_csv, ImportOptions, DEFAULT_WORKERS},
};
use std::path::PathBuf;
use std::sync::Arc;

/// Import quotes from a CSV file.
#[derive(Parser)]
#[command(
    name = "import-quotes",
    version,
    about = "Import quotes from a CSV file into the quote library",
    long_about = "Reads a CSV with a header row and `content,author` columns. Database \
                  settings come from the POSTGRES_* environment variables."
)]
struct Cli {
    /// Path to the CSV file.
    csv_path: PathBuf,

    /// Parse and validate only; insert nothing.
    #[arg(long)]
    dry_run: bool,

    /// Number of concurrent insert workers.
    #[arg(long, short, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let file = std::fs::File::open(&cli.csv_path)
        .with_context(|| format!("Failed to open {}", cli.csv_path.display()))?;

    let store = PgStore::connect(&database_url_from_env()?)
        .await
        .context("Failed to connect to Postgres")?;
    store
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    tracing::info!(
        path = %cli.csv_path.display(),
        workers = cli.workers,
        dry_run = cli.dry_run,
        "Importing quotes"
    );

    let summary = import_csv(
        std::io::BufReader::new(file),
        Arc::new(store),
        ImportOptions {
            workers: cli.workers,
            dry_run: cli.dry_run,
        },
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
