//! Conversion entity: an order event plus its forwarding outcome.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "conversions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tracking_link_id: String,
    pub order_id: String,
    pub order_amount: f64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub meta_sent: bool,
    pub meta_sent_at: Option<DateTimeUtc>,
    pub fb_trace_id: Option<String>,
    pub events_received: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
