//! One-shot catalog maintenance: ingest connector folders and resolve
//! compatibility relationships.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use db::{DBService, DEFAULT_DATABASE_URL};
use services::services::{
    connector_ingest::ConnectorIngestService, database_validator::DatabaseValidator,
    relationship_sync::sync_with_audit,
};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "catalog-migrate", about = "RAST 5 catalog data migration")]
struct Cli {
    /// Catalog database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    database_url: String,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create connector records from a folder of connector directories
    Ingest {
        /// Directory whose subdirectories are named after connector ids
        #[arg(long)]
        source: PathBuf,
    },
    /// Recompute mates_with / assembly_variants for every connector
    Relationships {
        /// Resolve and report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Ingest, then resolve relationships over the complete set
    All {
        #[arg(long)]
        source: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init_tracing("info,sqlx=warn");

    let cli = Cli::parse();
    let db = DBService::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open database {}", cli.database_url))?;

    let validation = DatabaseValidator::new(db.pool.clone()).ensure_ready().await?;
    info!(summary = %validation.summary(), "Database validated");

    run(&db, cli.command, cli.json).await
}

async fn run(db: &DBService, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Ingest { source } => ingest(db, &source, json).await,
        Command::Relationships { dry_run } => relationships(db, dry_run, json).await,
        // Relationships are resolved over the complete set, so ingest first
        Command::All { source } => {
            ingest(db, &source, json).await?;
            relationships(db, false, json).await
        }
    }
}

async fn ingest(db: &DBService, source: &Path, json: bool) -> anyhow::Result<()> {
    let report = ConnectorIngestService::new(db.pool.clone())
        .ingest_dir(source, None)
        .await
        .with_context(|| format!("ingest from {} failed", source.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    for issue in &report.invalid {
        warn!(folder = %issue.folder, error = %issue.error, "Skipped folder");
    }
    info!(
        created = report.created.len(),
        skipped = report.skipped_existing.len(),
        invalid = report.invalid.len(),
        "Ingest finished"
    );
    Ok(())
}

async fn relationships(db: &DBService, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let report = sync_with_audit(db, None, dry_run).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    for failure in &report.failures {
        error!(connector_id = %failure.connector_id, error = %failure.error, "Not updated");
    }
    if !report.is_complete() {
        bail!(
            "{} of {} connectors were not updated; rerun the pass",
            report.failures.len(),
            report.total
        );
    }
    Ok(())
}
