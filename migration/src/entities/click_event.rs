//! Click event entity: one immutable row per inbound redirect or callback.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "click_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub click_id: String,
    pub tracking_link_id: String,
    pub seller_id: String,
    pub campaign_id: Option<String>,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referer: Option<String>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    /// Origin tag: t_redirect | go_redirect | tt_redirect | bridge_shop | loading_page
    pub source: String,
    pub is_unique: bool,
    pub is_converted: bool,
    pub converted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
