use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Metrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metrics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metrics::VaultId).integer().not_null())
                    .col(ColumnDef::new(Metrics::MetricTypeId).integer().not_null())
                    .col(ColumnDef::new(Metrics::BlockNumber).big_integer().null())
                    .col(
                        ColumnDef::new(Metrics::BlockTimestamp)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Metrics::CollectedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Metrics::ValueNumeric)
                            .decimal_len(38, 24)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Metrics::Source).string().null())
                    .to_owned(),
            )
            .await?;

        // Idempotency key: one observation per (vault, metric type, block)
        manager
            .create_index(
                Index::create()
                    .name("uq_metrics_vault_metric_block")
                    .table(Metrics::Table)
                    .col(Metrics::VaultId)
                    .col(Metrics::MetricTypeId)
                    .col(Metrics::BlockNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Series lookups filter by vault and time
        manager
            .create_index(
                Index::create()
                    .name("idx_metrics_vault_block_time")
                    .table(Metrics::Table)
                    .col(Metrics::VaultId)
                    .col(Metrics::BlockTimestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Metrics {
    Table,
    Id,
    VaultId,
    MetricTypeId,
    BlockNumber,
    BlockTimestamp,
    CollectedAt,
    ValueNumeric,
    Source,
}
