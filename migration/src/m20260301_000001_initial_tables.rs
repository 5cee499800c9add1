//! Initial schema: tracking links, click events, campaigns, seller accounts.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackingLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackingLinks::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::SellerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackingLinks::CampaignId).string_len(64).null())
                    .col(ColumnDef::new(TrackingLinks::DestinationUrl).text().not_null())
                    .col(ColumnDef::new(TrackingLinks::UtmSource).string_len(255).null())
                    .col(ColumnDef::new(TrackingLinks::UtmMedium).string_len(255).null())
                    .col(ColumnDef::new(TrackingLinks::UtmCampaign).string_len(255).null())
                    .col(
                        ColumnDef::new(TrackingLinks::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::ConversionCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::LastClickAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(TrackingLinks::StoreSlug).string_len(255).null())
                    .col(ColumnDef::new(TrackingLinks::VideoCode).string_len(255).null())
                    .col(ColumnDef::new(TrackingLinks::MetaPixelId).string_len(64).null())
                    .col(
                        ColumnDef::new(TrackingLinks::MetaAccessToken)
                            .string_len(512)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClickEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickEvents::ClickId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::TrackingLinkId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickEvents::SellerId).string_len(64).not_null())
                    .col(ColumnDef::new(ClickEvents::CampaignId).string_len(64).null())
                    .col(ColumnDef::new(ClickEvents::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(ClickEvents::UserAgent).text().null())
                    .col(ColumnDef::new(ClickEvents::Referer).text().null())
                    .col(ColumnDef::new(ClickEvents::Fbp).string_len(255).null())
                    .col(ColumnDef::new(ClickEvents::Fbc).string_len(512).null())
                    .col(ColumnDef::new(ClickEvents::UtmSource).string_len(255).null())
                    .col(ColumnDef::new(ClickEvents::UtmMedium).string_len(255).null())
                    .col(ColumnDef::new(ClickEvents::UtmCampaign).string_len(255).null())
                    .col(ColumnDef::new(ClickEvents::Source).string_len(32).not_null())
                    .col(ColumnDef::new(ClickEvents::IsUnique).boolean().not_null())
                    .col(
                        ColumnDef::new(ClickEvents::IsConverted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::ConvertedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string_len(255).null())
                    .col(
                        ColumnDef::new(Campaigns::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SellerAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SellerAccounts::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SellerAccounts::Name).string_len(255).null())
                    .col(ColumnDef::new(SellerAccounts::MetaPixelId).string_len(64).null())
                    .col(
                        ColumnDef::new(SellerAccounts::MetaAccessToken)
                            .string_len(512)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SellerAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index for the /tt/{slug}/{code} route
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_links_store_video")
                    .table(TrackingLinks::Table)
                    .col(TrackingLinks::StoreSlug)
                    .col(TrackingLinks::VideoCode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tracking_links_store_video")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SellerAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClickEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackingLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrackingLinks {
    #[sea_orm(iden = "tracking_links")]
    Table,
    Id,
    SellerId,
    CampaignId,
    DestinationUrl,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    Status,
    ClickCount,
    ConversionCount,
    LastClickAt,
    StoreSlug,
    VideoCode,
    MetaPixelId,
    MetaAccessToken,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    ClickId,
    TrackingLinkId,
    SellerId,
    CampaignId,
    IpAddress,
    UserAgent,
    Referer,
    Fbp,
    Fbc,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    Source,
    IsUnique,
    IsConverted,
    ConvertedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    #[sea_orm(iden = "campaigns")]
    Table,
    Id,
    Name,
    ClickCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SellerAccounts {
    #[sea_orm(iden = "seller_accounts")]
    Table,
    Id,
    Name,
    MetaPixelId,
    MetaAccessToken,
    CreatedAt,
}
