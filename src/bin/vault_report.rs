// src/bin/vault_report.rs
//
// Offline period report over the persisted metric series for one vault:
// share-price return, max drawdown, log-return volatility and TVL change.
// Usage: cargo run --bin vault_report -- --vault 0x... \
//   --from-iso 2026-01-10T00:00:00 --to-iso 2026-01-17T23:59:59

use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::Database;
use std::env;

use vault_metrics_etl::config::{self, ENV_DATABASE_URL};
use vault_metrics_etl::services::report::compute_report;
use vault_metrics_etl::services::store::{MetricStore, SqlMetricStore};

#[derive(Parser)]
#[command(name = "vault_report", about = "Period statistics for one vault")]
struct Cli {
    /// Vault address (any casing; normalized to checksum form)
    #[arg(long)]
    vault: String,
    /// Period start, ISO-8601, inclusive
    #[arg(long)]
    from_iso: String,
    /// Period end, ISO-8601, inclusive
    #[arg(long)]
    to_iso: String,
}

fn as_percent(v: Decimal) -> Decimal {
    (v * dec!(100)).round_dp(4)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let vault = config::parse_vault_addresses(&cli.vault)?
        .into_iter()
        .next()
        .expect("parse_vault_addresses yields at least one address on success");
    let from = config::parse_iso_utc(&cli.from_iso)?;
    let to = config::parse_iso_utc(&cli.to_iso)?;

    let database_url = env::var(ENV_DATABASE_URL)
        .map_err(|_| format!("{} must be set", ENV_DATABASE_URL))?;
    let db = Database::connect(&database_url).await?;
    let store = SqlMetricStore::new(db);

    let series = store.query_series(&vault, from, to).await?;
    let report = compute_report(&series)?;

    println!("=== REPORT ===");
    println!("Vault:  {}", vault);
    println!("Period: {} .. {} UTC", from, to);
    println!("Points: {}", report.points);
    match report.period_return {
        Some(r) => println!("Return: {}%", as_percent(r)),
        None => println!("Return: n/a (zero opening price)"),
    }
    println!("MaxDD:  {}%", as_percent(report.max_drawdown));
    match report.volatility {
        Some(v) => println!("Sigma:  {}%", as_percent(v)),
        None => println!("Sigma:  n/a (fewer than 2 returns)"),
    }
    if let Some(change) = report.tvl_change {
        println!("dTVL:   {}%", as_percent(change));
    }

    Ok(())
}
