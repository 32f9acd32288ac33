//! SeaORM Entity for the seeded metric type dictionary

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metric_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stable code: 'TVL_ASSET' or 'SHARE_PRICE'
    #[sea_orm(unique)]
    pub code: String,
    /// Human-readable name
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
