use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tracking_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub seller_id: String,
    pub campaign_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub destination_url: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    /// `active` | `paused` | `archived`
    pub status: String,
    pub click_count: i64,
    pub conversion_count: i64,
    pub last_click_at: Option<DateTimeUtc>,
    /// Store slug + video code for the `/tt/{slug}/{code}` lookup
    pub store_slug: Option<String>,
    pub video_code: Option<String>,
    /// Link-level Conversions API credentials; seller defaults apply when absent
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
