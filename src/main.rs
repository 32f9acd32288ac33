use clap::{Parser, Subcommand};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vault_metrics_etl::config::{self, EtlConfig};
use vault_metrics_etl::services::chain::EvmChainClient;
use vault_metrics_etl::services::orchestrator::CollectionOrchestrator;
use vault_metrics_etl::services::store::{MetricStore, SqlMetricStore};

#[derive(Parser)]
#[command(name = "vault-metrics-etl", about = "ERC-4626 vault metrics ETL")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// One-shot collection at the current head block (cron-friendly)
    Incremental,
    /// Collect across a UTC time range at a fixed step
    Backfill {
        /// Period start, ISO-8601 (e.g. 2026-01-10T00:00:00)
        #[arg(long)]
        start_iso: String,
        /// Period end, ISO-8601; must be after the start
        #[arg(long)]
        end_iso: String,
        /// Step between collection instants, seconds
        #[arg(long, default_value_t = 300)]
        step_sec: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vault_metrics_etl=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Configuration failures are fatal before any chain or DB interaction
    let cfg = match EtlConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    // Backfill bounds are parsed and validated before anything is touched
    let parsed_range = match &cli.mode {
        Mode::Backfill {
            start_iso,
            end_iso,
            step_sec,
        } => {
            let start = config::parse_iso_utc(start_iso);
            let end = config::parse_iso_utc(end_iso);
            match (start, end) {
                (Ok(start), Ok(end)) => {
                    if end <= start {
                        tracing::error!(start = %start, end = %end, "end-iso must be after start-iso");
                        std::process::exit(1);
                    }
                    if *step_sec <= 0 {
                        tracing::error!(step_sec = step_sec, "step-sec must be positive");
                        std::process::exit(1);
                    }
                    Some((start, end))
                }
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "Invalid backfill bounds");
                    std::process::exit(1);
                }
            }
        }
        Mode::Incremental => None,
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = match Database::connect(&cfg.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    // Run migrations (idempotent schema creation)
    tracing::info!("Running migrations...");
    if let Err(e) = migration::Migrator::up(&db, None).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let store = Arc::new(SqlMetricStore::new(db));
    if let Err(e) = store.ensure_metric_types().await {
        tracing::error!(error = %e, "Failed to seed metric types");
        std::process::exit(1);
    }
    if let Err(e) = store.ensure_vaults(&cfg.vaults).await {
        tracing::error!(error = %e, "Failed to register vaults");
        std::process::exit(1);
    }

    // Connectivity failures are fatal at startup
    let chain = match EvmChainClient::connect(&cfg.rpc_url).await {
        Ok(chain) => Arc::new(chain),
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to chain RPC");
            std::process::exit(1);
        }
    };

    let orchestrator = CollectionOrchestrator::new(chain, store, cfg.vaults.clone());

    let result = match (&cli.mode, parsed_range) {
        (Mode::Incremental, _) => orchestrator.run_incremental().await,
        (Mode::Backfill { step_sec, .. }, Some((start, end))) => {
            orchestrator.run_backfill(start, end, *step_sec).await
        }
        // Bounds are always parsed for backfill above
        (Mode::Backfill { .. }, None) => unreachable!(),
    };

    match result {
        Ok(summary) => {
            tracing::info!(
                collected = summary.collected,
                attempted = summary.attempted,
                "Run finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            std::process::exit(1);
        }
    }
}
