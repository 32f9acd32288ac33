//! Environment-sourced configuration
//!
//! All three inputs are required; a missing one is a fatal startup error
//! raised before any chain or database interaction. Vault addresses are
//! normalized to their EIP-55 checksum form at load so the database only
//! ever sees one spelling per vault.

use alloy::primitives::Address;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::env;
use std::str::FromStr;

/// Environment variable for the chain RPC endpoint
pub const ENV_RPC_URL: &str = "RPC_URL";

/// Environment variable for the database connection URL
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable for the comma-separated vault address list
pub const ENV_VAULT_ADDRESSES: &str = "VAULT_ADDRESSES";

/// Error types for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidAddress(String),
    InvalidTimestamp(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(name) => {
                write!(f, "Required environment variable {} is not set", name)
            }
            ConfigError::InvalidAddress(addr) => {
                write!(f, "Invalid vault address in {}: {}", ENV_VAULT_ADDRESSES, addr)
            }
            ConfigError::InvalidTimestamp(s) => {
                write!(f, "Invalid ISO-8601 timestamp: {}", s)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub rpc_url: String,
    pub database_url: String,
    /// EIP-55 checksummed vault addresses, in configured order
    pub vaults: Vec<String>,
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Parse a comma-separated address list into checksummed form, dropping
/// empty entries.
pub fn parse_vault_addresses(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut vaults = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let addr = Address::from_str(part)
            .map_err(|_| ConfigError::InvalidAddress(part.to_string()))?;
        vaults.push(addr.to_checksum(None));
    }
    if vaults.is_empty() {
        return Err(ConfigError::MissingVar(ENV_VAULT_ADDRESSES));
    }
    Ok(vaults)
}

/// Parse an ISO-8601 timestamp as UTC.
///
/// Accepts full RFC 3339 (`2026-01-10T00:00:00Z`, offsets honored) and
/// naive `YYYY-MM-DDTHH:MM:SS`, which is taken as UTC.
pub fn parse_iso_utc(s: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| ConfigError::InvalidTimestamp(s.to_string()))
}

impl EtlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = required_var(ENV_RPC_URL)?;
        let database_url = required_var(ENV_DATABASE_URL)?;
        let vaults = parse_vault_addresses(&required_var(ENV_VAULT_ADDRESSES)?)?;

        Ok(Self {
            rpc_url,
            database_url,
            vaults,
        })
    }
}
