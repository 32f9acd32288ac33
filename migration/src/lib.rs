pub use sea_orm_migration::prelude::*;

mod m20260810_000001_create_vaults;
mod m20260810_000002_create_metric_types;
mod m20260811_000001_create_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_000001_create_vaults::Migration),
            Box::new(m20260810_000002_create_metric_types::Migration),
            Box::new(m20260811_000001_create_metrics::Migration),
        ]
    }
}
