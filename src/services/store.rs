//! Metric persistence over SeaORM
//!
//! The [`MetricStore`] trait is the persistence seam of the pipeline: the
//! collector only ever inserts missing rows, never updates or deletes.
//! Insert-if-absent is done with `ON CONFLICT DO NOTHING` semantics at the
//! storage layer (SeaORM `on_conflict` + `do_nothing`), never as a
//! check-then-insert pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, TryInsertResult,
};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::entities::{metric_types, metrics, prelude::*, vaults};

/// Metric kinds persisted by the pipeline. Fixed, seeded set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCode {
    TvlAsset,
    SharePrice,
}

impl MetricCode {
    pub fn code(self) -> &'static str {
        match self {
            MetricCode::TvlAsset => "TVL_ASSET",
            MetricCode::SharePrice => "SHARE_PRICE",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricCode::TvlAsset => "TVL in underlying asset",
            MetricCode::SharePrice => "Share price (PPS)",
        }
    }
}

/// One observation ready to persist
#[derive(Debug, Clone)]
pub struct NewMetric {
    pub vault_id: i32,
    pub metric_type_id: i32,
    pub block_number: Option<i64>,
    pub block_timestamp: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub value: Decimal,
    pub source: String,
}

/// One row of a reconstructed time series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub code: String,
    pub ts: DateTime<Utc>,
    pub value: Decimal,
}

/// Error types for the store
#[derive(Debug)]
pub enum StoreError {
    DatabaseError(String),
    NotFound(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence operations used by the collection pipeline and reporting
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Seed the metric type dictionary, insert-if-absent.
    async fn ensure_metric_types(&self) -> Result<(), StoreError>;

    /// Register vault addresses, insert-if-absent. Never mutates rows.
    async fn ensure_vaults(&self, addresses: &[String]) -> Result<(), StoreError>;

    async fn vault_id(&self, address: &str) -> Result<i32, StoreError>;

    async fn metric_type_id(&self, code: MetricCode) -> Result<i32, StoreError>;

    /// Atomic insert-if-absent under the (vault, metric type, block)
    /// uniqueness key. Returns `false` when the row already existed.
    async fn insert_metric_if_absent(&self, metric: NewMetric) -> Result<bool, StoreError>;

    /// Metric rows for one vault whose effective timestamp
    /// (`COALESCE(block_timestamp, collected_at)`) falls in the inclusive
    /// range, with the metric-type code attached, ordered ascending.
    async fn query_series(
        &self,
        vault_address: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError>;
}

/// SeaORM-backed metric store. The connection is injected at construction
/// and scoped to one run; there is no module-level connection state.
pub struct SqlMetricStore {
    db: DatabaseConnection,
}

impl SqlMetricStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn effective_ts_expr() -> SimpleExpr {
        SimpleExpr::FunctionCall(Func::coalesce([
            Expr::col(metrics::Column::BlockTimestamp).into(),
            Expr::col(metrics::Column::CollectedAt).into(),
        ]))
    }
}

#[async_trait]
impl MetricStore for SqlMetricStore {
    async fn ensure_metric_types(&self) -> Result<(), StoreError> {
        let rows = [MetricCode::TvlAsset, MetricCode::SharePrice]
            .into_iter()
            .map(|mc| metric_types::ActiveModel {
                code: Set(mc.code().to_string()),
                name: Set(mc.display_name().to_string()),
                ..Default::default()
            })
            .collect::<Vec<_>>();

        MetricTypes::insert_many(rows)
            .on_conflict(
                OnConflict::column(metric_types::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to seed metric types: {}", e)))?;

        Ok(())
    }

    async fn ensure_vaults(&self, addresses: &[String]) -> Result<(), StoreError> {
        if addresses.is_empty() {
            return Ok(());
        }

        let rows = addresses
            .iter()
            .map(|addr| vaults::ActiveModel {
                address_proxy: Set(addr.clone()),
                ..Default::default()
            })
            .collect::<Vec<_>>();

        Vaults::insert_many(rows)
            .on_conflict(
                OnConflict::column(vaults::Column::AddressProxy)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to register vaults: {}", e)))?;

        Ok(())
    }

    async fn vault_id(&self, address: &str) -> Result<i32, StoreError> {
        let vault = Vaults::find()
            .filter(vaults::Column::AddressProxy.eq(address))
            .one(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to query vault: {}", e)))?
            .ok_or_else(|| StoreError::NotFound(format!("Vault {} is not registered", address)))?;

        Ok(vault.id)
    }

    async fn metric_type_id(&self, code: MetricCode) -> Result<i32, StoreError> {
        let mt = MetricTypes::find()
            .filter(metric_types::Column::Code.eq(code.code()))
            .one(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to query metric type: {}", e)))?
            .ok_or_else(|| {
                StoreError::NotFound(format!("Metric type {} is not seeded", code.code()))
            })?;

        Ok(mt.id)
    }

    async fn insert_metric_if_absent(&self, metric: NewMetric) -> Result<bool, StoreError> {
        let row = metrics::ActiveModel {
            vault_id: Set(metric.vault_id),
            metric_type_id: Set(metric.metric_type_id),
            block_number: Set(metric.block_number),
            block_timestamp: Set(metric.block_timestamp.map(|ts| ts.fixed_offset())),
            collected_at: Set(metric.collected_at.fixed_offset()),
            value_numeric: Set(metric.value),
            source: Set(Some(metric.source)),
            ..Default::default()
        };

        let outcome = Metrics::insert(row)
            .on_conflict(
                OnConflict::columns([
                    metrics::Column::VaultId,
                    metrics::Column::MetricTypeId,
                    metrics::Column::BlockNumber,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to insert metric: {}", e)))?;

        match outcome {
            TryInsertResult::Inserted(_) => Ok(true),
            _ => {
                debug!(
                    vault_id = metric.vault_id,
                    metric_type_id = metric.metric_type_id,
                    block = ?metric.block_number,
                    "Metric row already present, left untouched"
                );
                Ok(false)
            }
        }
    }

    async fn query_series(
        &self,
        vault_address: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        let vault_id = self.vault_id(vault_address).await?;

        let codes: HashMap<i32, String> = MetricTypes::find()
            .all(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to load metric types: {}", e)))?
            .into_iter()
            .map(|mt| (mt.id, mt.code))
            .collect();

        let ts_expr = Self::effective_ts_expr();
        let rows = Metrics::find()
            .filter(metrics::Column::VaultId.eq(vault_id))
            .filter(Expr::expr(ts_expr.clone()).between(from.fixed_offset(), to.fixed_offset()))
            .order_by(ts_expr, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to query series: {}", e)))?;

        let mut series = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(code) = codes.get(&row.metric_type_id) else {
                warn!(
                    metric_type_id = row.metric_type_id,
                    "Metric row references an unknown metric type, skipping"
                );
                continue;
            };
            let ts = row.block_timestamp.unwrap_or(row.collected_at);
            series.push(SeriesPoint {
                code: code.clone(),
                ts: ts.with_timezone(&Utc),
                value: row.value_numeric,
            });
        }

        Ok(series)
    }
}
