//! SeaORM Entity for persisted metric observations
//!
//! One row per (vault, metric type, block) — enforced by the
//! `uq_metrics_vault_metric_block` unique index, which makes repeated
//! collection at the same block a no-op instead of a duplicate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub vault_id: i32,
    pub metric_type_id: i32,
    /// Block the state was read at; NULL for un-pinned observations
    pub block_number: Option<i64>,
    /// Wall-clock time the block was produced
    pub block_timestamp: Option<DateTimeWithTimeZone>,
    /// Wall-clock time the read occurred
    pub collected_at: DateTimeWithTimeZone,
    /// Non-negative metric value (TVL in asset units, PPS as a ratio)
    #[sea_orm(column_type = "Decimal(Some((38, 24)))")]
    pub value_numeric: Decimal,
    /// Free-text source tag, e.g. 'incremental:latest' or 'backfill'
    pub source: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
