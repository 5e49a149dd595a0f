use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use member_ingest::app::IngestUseCase;
use member_ingest::config::Config;
use member_ingest::pipeline::ingestion::LocalObjectStore;
use member_ingest::pipeline::storage::SqliteMemberStore;
use member_ingest::{logging, metrics};

#[derive(Parser)]
#[command(name = "member_ingest")]
#[command(about = "Client member roster ingestion with quarantine and audit trail")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to ./ingest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of the run's metrics to this file
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one client roster CSV
    Ingest {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the analytics queries over the member store
    Report,
    /// Show a stored client file
    Stat {
        #[arg(long)]
        client_id: String,
        /// Stored object name, e.g. 250101_120000_members.csv
        #[arg(long)]
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let _guard = logging::init_logging(&config.logging);
    metrics::init_metrics();

    let result = run(cli.command, &config);

    if let Some(path) = &cli.metrics_out {
        if let Some(snapshot) = metrics::render() {
            std::fs::write(path, snapshot)
                .with_context(|| format!("writing metrics to {}", path.display()))?;
            info!("Metrics written to {}", path.display());
        }
    }

    result
}

fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { client_id, file } => {
            println!("🔄 Ingesting {} for client {}...", file.display(), client_id);

            let store = SqliteMemberStore::open(&config.paths.database_path)?;
            let mut use_case = IngestUseCase::from_paths(&config.paths, store);

            match use_case.run(&client_id, &file) {
                Ok(outcome) => {
                    println!("\n📊 Ingestion results for {}:", client_id);
                    println!("   Batch: {}", outcome.batch.batch_id);
                    println!("   Checksum: {}", outcome.metadata.checksum);
                    println!("   Rows read: {}", outcome.batch.total_rows_read);
                    println!("   Accepted: {}", outcome.audit.valid_row_count);
                    println!("   Rejected: {}", outcome.audit.rejected_row_count);
                    if let Some(path) = &outcome.batch.quarantine_path {
                        println!("   Quarantine file: {}", path.display());
                    }
                    println!("   Audit file: {}", outcome.audit_path.display());
                    Ok(())
                }
                Err(e) => {
                    error!("Ingestion failed: {}", e);
                    println!("❌ Ingestion failed: {}", e);
                    Err(e.into())
                }
            }
        }
        Commands::Report => {
            let store = SqliteMemberStore::open(&config.paths.database_path)?;

            println!("Unique members per client");
            for row in store.unique_members_per_client()? {
                println!("   {:<20} {}", row.client_id, row.unique_members);
            }

            println!("\nTop ZIP codes by member count");
            for row in store.members_per_zip()? {
                println!("   {:<20} {}", row.zip5, row.member_count);
            }

            println!("\nIngestion error rate (rejected / total)");
            for row in store.ingestion_error_rate()? {
                println!("   {:<20} {:.4}", row.client_id, row.error_rate);
            }
            Ok(())
        }
        Commands::Stat { client_id, name } => {
            let object_store = LocalObjectStore::new(&config.paths.raw_root);
            match object_store.get_metadata(&client_id, &name)? {
                Some(object) => {
                    println!("{}", object.path.display());
                    println!("   Size: {} bytes", object.size);
                    println!("   Modified: {}", object.modified.to_rfc3339());
                }
                None => println!("⚠️  No stored file {} for client {}", name, client_id),
            }
            Ok(())
        }
    }
}
