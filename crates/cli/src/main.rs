//! `backfill-s3-urls`: restore truncated upload backup URLs from object storage.

use anyhow::{Context, Result};
use backfill_cli::{
    ApplyOptions, DiscoverOptions, apply_backup_urls, discover_backup_urls, seed_candidates,
};
use backfill_core::DateWindow;
use backfill_ledger::{CandidateRepo, SqliteLedger};
use backfill_storage::ListingOptions;
use backfill_uploads::PostgresUploads;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "backfill-s3-urls")]
#[command(version, about = "Restore upload backup URLs truncated by the chunked upload bug")]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "BACKFILL_CONFIG",
        default_value = "backfill.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find candidate uploads and record their backup URLs in a ledger
    #[command(alias = "get-urls")]
    Discover {
        /// Start of the `updated_at` window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, default_value = "2022-03-17")]
        start_date: String,

        /// End of the `updated_at` window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, default_value = "2022-06-05")]
        end_date: String,

        /// Ledger file (default: backfill-{start}-{end}.db)
        #[arg(long)]
        state_db: Option<PathBuf>,

        /// Resume an existing ledger without running the candidate query
        #[arg(long, default_value_t = false)]
        skip_query: bool,

        /// Tenant label in the object prefix (overrides config)
        #[arg(long)]
        app_name: Option<String>,
    },
    /// Write backup URLs recorded in a ledger back to the database
    #[command(alias = "update-urls")]
    Apply {
        /// Ledger file produced by `discover`
        #[arg(long)]
        state_db: PathBuf,

        /// Uploads updated per batch (overrides config)
        #[arg(long)]
        batch_size: Option<u32>,

        /// Seconds to wait between batches (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("backfill-s3-urls v{}", env!("CARGO_PKG_VERSION"));

    let config =
        backfill_cli::config::load(&cli.config).context("failed to load configuration")?;

    match cli.command {
        Commands::Discover {
            start_date,
            end_date,
            state_db,
            skip_query,
            app_name,
        } => {
            let window = DateWindow::parse(&start_date, &end_date)?;
            let storage = config.require_storage()?.clone();
            let read_database = if skip_query {
                None
            } else {
                Some(config.require_read_database()?.clone())
            };
            let state_db = state_db.unwrap_or_else(|| window.default_ledger_path());
            let options = DiscoverOptions {
                app_name: app_name.unwrap_or_else(|| config.discover.app_name.clone()),
                log_every: config.discover.log_every,
                listing: ListingOptions::default(),
            };

            let lister = backfill_storage::from_config(&storage)
                .await
                .context("failed to initialize object storage")?;

            let ledger = SqliteLedger::open(&state_db)
                .await
                .with_context(|| format!("failed to open ledger {}", state_db.display()))?;
            tracing::info!(state_db = %ledger.path().display(), "Recording backup URLs to ledger");

            if let Some(database) = read_database {
                let uploads = PostgresUploads::connect(&database)
                    .await
                    .map_err(backfill_cli::BackfillError::from)?;
                seed_candidates(&ledger, &uploads, &window).await?;
                uploads.close().await;
            } else {
                tracing::info!("Skipping candidate query, resuming existing ledger");
            }

            let report = discover_backup_urls(&ledger, lister.as_ref(), &options).await?;

            let counts = ledger.get_counts().await?;
            tracing::info!(
                checked = report.checked,
                urls = report.urls,
                total = counts.total,
                unchecked = counts.unchecked(),
                state_db = %ledger.path().display(),
                "Backup URL discovery complete"
            );
            ledger.close().await;
        }
        Commands::Apply {
            state_db,
            batch_size,
            interval,
        } => {
            let database = config.require_write_database()?.clone();
            let options = ApplyOptions {
                batch_size: batch_size.unwrap_or(config.apply.batch_size),
                interval: interval
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.apply.interval()),
            };

            let ledger = SqliteLedger::open(&state_db)
                .await
                .with_context(|| format!("failed to open ledger {}", state_db.display()))?;
            let uploads = PostgresUploads::connect(&database)
                .await
                .map_err(backfill_cli::BackfillError::from)?;

            let report = apply_backup_urls(&ledger, &uploads, options).await?;

            let counts = ledger.get_counts().await?;
            tracing::info!(
                batches = report.batches,
                applied = report.applied,
                total = counts.total,
                remaining = counts.remaining(),
                "Backfill complete"
            );
            uploads.close().await;
            ledger.close().await;
        }
    }

    Ok(())
}
