//! Test doubles for the collection pipeline
//!
//! `FakeChain` scripts a monotonic chain (block i produced at
//! `genesis_ts + i * block_time`) with per-vault state and optional
//! per-vault failures; every read increments a call counter so tests can
//! assert that validation happens before any chain access. `FakeStore`
//! is an in-memory metric store enforcing the same
//! (vault, metric type, block) uniqueness as the SQL schema.

use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vault_metrics_etl::services::chain::{ChainError, ChainReader, VaultState};
use vault_metrics_etl::services::store::{
    MetricCode, MetricStore, NewMetric, SeriesPoint, StoreError,
};

#[derive(Clone, Copy)]
pub struct FakeVault {
    pub decimals: u32,
    pub total_assets: U256,
    pub total_supply: U256,
}

pub struct FakeChain {
    pub genesis_ts: u64,
    pub block_time: u64,
    pub head: u64,
    vaults: HashMap<String, FakeVault>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl FakeChain {
    pub fn new(genesis_ts: u64, block_time: u64, head: u64) -> Self {
        Self {
            genesis_ts,
            block_time,
            head,
            vaults: HashMap::new(),
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vault(mut self, address: &str, vault: FakeVault) -> Self {
        self.vaults.insert(address.to_string(), vault);
        self
    }

    /// Every read touching this vault errors, like a broken contract
    pub fn with_failing_vault(mut self, address: &str) -> Self {
        self.failing.push(address.to_string());
        self
    }

    pub fn chain_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vault(&self, address: &str) -> Result<FakeVault, ChainError> {
        if self.failing.iter().any(|a| a == address) {
            return Err(ChainError::ContractCallError(format!(
                "scripted failure for {}",
                address
            )));
        }
        self.vaults
            .get(address)
            .copied()
            .ok_or_else(|| ChainError::ContractCallError(format!("unknown vault {}", address)))
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn head_block_number(&self) -> Result<u64, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head)
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if block > self.head {
            return Err(ChainError::ProviderError(format!("Block {} not found", block)));
        }
        Ok(self.genesis_ts + block * self.block_time)
    }

    async fn asset_decimals(&self, vault: &str) -> Result<u32, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vault(vault)?.decimals)
    }

    async fn vault_state_at(&self, vault: &str, block: u64) -> Result<VaultState, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if block > self.head {
            return Err(ChainError::ProviderError(format!("Block {} not found", block)));
        }
        let v = self.vault(vault)?;
        Ok(VaultState {
            total_assets: v.total_assets,
            total_supply: v.total_supply,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub vault_id: i32,
    pub metric_type_id: i32,
    pub block_number: Option<i64>,
    pub block_timestamp: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub value: Decimal,
    pub source: String,
}

#[derive(Default)]
struct StoreInner {
    vaults: Vec<String>,
    metric_types: Vec<String>,
    rows: Vec<StoredRow>,
}

#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<StoreInner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.inner.lock().unwrap().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }
}

#[async_trait]
impl MetricStore for FakeStore {
    async fn ensure_metric_types(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for code in [MetricCode::TvlAsset.code(), MetricCode::SharePrice.code()] {
            if !inner.metric_types.iter().any(|c| c == code) {
                inner.metric_types.push(code.to_string());
            }
        }
        Ok(())
    }

    async fn ensure_vaults(&self, addresses: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for addr in addresses {
            if !inner.vaults.iter().any(|a| a == addr) {
                inner.vaults.push(addr.clone());
            }
        }
        Ok(())
    }

    async fn vault_id(&self, address: &str) -> Result<i32, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .vaults
            .iter()
            .position(|a| a == address)
            .map(|idx| idx as i32 + 1)
            .ok_or_else(|| StoreError::NotFound(format!("Vault {} is not registered", address)))
    }

    async fn metric_type_id(&self, code: MetricCode) -> Result<i32, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .metric_types
            .iter()
            .position(|c| c == code.code())
            .map(|idx| idx as i32 + 1)
            .ok_or_else(|| StoreError::NotFound(format!("Metric type {} is not seeded", code.code())))
    }

    async fn insert_metric_if_absent(&self, metric: NewMetric) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let exists = inner.rows.iter().any(|r| {
            r.vault_id == metric.vault_id
                && r.metric_type_id == metric.metric_type_id
                && r.block_number == metric.block_number
        });
        if exists {
            return Ok(false);
        }
        inner.rows.push(StoredRow {
            vault_id: metric.vault_id,
            metric_type_id: metric.metric_type_id,
            block_number: metric.block_number,
            block_timestamp: metric.block_timestamp,
            collected_at: metric.collected_at,
            value: metric.value,
            source: metric.source,
        });
        Ok(true)
    }

    async fn query_series(
        &self,
        vault_address: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        let vault_id = self.vault_id(vault_address).await?;
        let inner = self.inner.lock().unwrap();
        let mut points: Vec<SeriesPoint> = inner
            .rows
            .iter()
            .filter(|r| r.vault_id == vault_id)
            .filter_map(|r| {
                let ts = r.block_timestamp.unwrap_or(r.collected_at);
                if ts < from || ts > to {
                    return None;
                }
                let code = inner.metric_types.get(r.metric_type_id as usize - 1)?;
                Some(SeriesPoint {
                    code: code.clone(),
                    ts,
                    value: r.value,
                })
            })
            .collect();
        points.sort_by_key(|p| p.ts);
        Ok(points)
    }
}
