//! Indexes for the two hot click-event queries: the one-hour dedup lookup
//! and the most-recent-click recovery used by conversion forwarding.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // (link, ip, created_at) narrows the dedup scan; the user-agent match
        // happens on the residual rows
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_dedup")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::TrackingLinkId)
                    .col(ClickEvents::IpAddress)
                    .col(ClickEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_link_created")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::TrackingLinkId)
                    .col(ClickEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_click_events_link_created")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_click_events_dedup").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    TrackingLinkId,
    IpAddress,
    CreatedAt,
}
