//! Conversions table: order events annotated with their CAPI forwarding outcome.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversions::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Conversions::TrackingLinkId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Conversions::OrderId).string_len(128).not_null())
                    .col(ColumnDef::new(Conversions::OrderAmount).double().not_null())
                    .col(ColumnDef::new(Conversions::ProductId).string_len(128).null())
                    .col(ColumnDef::new(Conversions::ProductName).string_len(255).null())
                    .col(ColumnDef::new(Conversions::Quantity).integer().null())
                    .col(
                        ColumnDef::new(Conversions::MetaSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Conversions::MetaSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Conversions::FbTraceId).string_len(128).null())
                    .col(ColumnDef::new(Conversions::EventsReceived).integer().null())
                    .col(
                        ColumnDef::new(Conversions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversions_link")
                    .table(Conversions::Table)
                    .col(Conversions::TrackingLinkId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_conversions_link").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Conversions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Conversions {
    #[sea_orm(iden = "conversions")]
    Table,
    Id,
    TrackingLinkId,
    OrderId,
    OrderAmount,
    ProductId,
    ProductName,
    Quantity,
    MetaSent,
    MetaSentAt,
    FbTraceId,
    EventsReceived,
    CreatedAt,
}
