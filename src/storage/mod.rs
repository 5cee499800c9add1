//! Storage layer: domain models, the `Storage` trait, and the backend
//! factory. Production uses the SeaORM backend (SQLite/MySQL/PostgreSQL);
//! the memory backend serves tests and local development.

pub mod backend;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attribution::{ClickSink, ClickSource};
use crate::config::get_config;
use crate::errors::Result;

pub use backend::SeaOrmStorage;
pub use memory::MemoryStorage;

/// `active` | `paused` | `archived`. Only active links are honored by the
/// redirect dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Active,
    Paused,
    Archived,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Paused => "paused",
            LinkStatus::Archived => "archived",
        }
    }

    /// Lenient parse; an unrecognized status is treated as paused so the
    /// dispatcher falls back to the site root rather than honoring it.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => LinkStatus::Active,
            "archived" => LinkStatus::Archived,
            _ => LinkStatus::Paused,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LinkStatus::Active)
    }
}

/// A distributed short link owned by a seller, mapping to a destination URL
/// plus attribution tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingLink {
    pub id: String,
    pub seller_id: String,
    pub campaign_id: Option<String>,
    pub destination_url: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub status: LinkStatus,
    pub click_count: i64,
    pub conversion_count: i64,
    pub last_click_at: Option<DateTime<Utc>>,
    pub store_slug: Option<String>,
    pub video_code: Option<String>,
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One immutable record per inbound redirect or callback request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub click_id: String,
    pub tracking_link_id: String,
    pub seller_id: String,
    pub campaign_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub source: ClickSource,
    pub is_unique: bool,
    pub is_converted: bool,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Seller account row; only the default Conversions API credentials matter
/// to this service.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerAccount {
    pub id: String,
    pub name: Option<String>,
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order event tied to a tracking link, annotated with its forwarding
/// outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub id: String,
    pub tracking_link_id: String,
    pub order_id: String,
    pub order_amount: f64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub meta_sent: bool,
    pub meta_sent_at: Option<DateTime<Utc>>,
    pub fb_trace_id: Option<String>,
    pub events_received: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Forwarding outcome written back onto a conversion row.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRecord {
    pub meta_sent: bool,
    pub meta_sent_at: Option<DateTime<Utc>>,
    pub fb_trace_id: Option<String>,
    pub events_received: Option<i32>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_link(&self, id: &str) -> Result<Option<TrackingLink>>;

    /// Resolve a link by (store slug, video code), for the `/tt` route.
    async fn get_link_by_video(
        &self,
        store_slug: &str,
        video_code: &str,
    ) -> Result<Option<TrackingLink>>;

    /// Links and sellers are created by the wider SaaS; these writes exist
    /// for seeding and tests.
    async fn insert_link(&self, link: TrackingLink) -> Result<()>;
    async fn insert_seller(&self, seller: SellerAccount) -> Result<()>;

    async fn insert_click(&self, click: ClickEvent) -> Result<()>;
    async fn get_click(&self, click_id: &str) -> Result<Option<ClickEvent>>;
    async fn clicks_for_link(&self, link_id: &str) -> Result<Vec<ClickEvent>>;

    /// Does a click for the same (link, ip, user-agent) triple exist at or
    /// after `since`? Exact string matching, absent values included.
    async fn has_recent_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    /// Most recently created click for a link, if any.
    async fn latest_click(&self, link_id: &str) -> Result<Option<ClickEvent>>;

    async fn mark_click_converted(&self, click_id: &str, at: DateTime<Utc>) -> Result<()>;
    async fn increment_link_conversions(&self, link_id: &str) -> Result<()>;

    async fn get_seller(&self, id: &str) -> Result<Option<SellerAccount>>;

    async fn get_conversion(&self, id: &str) -> Result<Option<Conversion>>;
    async fn insert_conversion(&self, conversion: Conversion) -> Result<()>;
    async fn record_forward_result(
        &self,
        conversion_id: &str,
        record: ForwardRecord,
    ) -> Result<()>;

    fn backend_name(&self) -> &str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// Create the configured backend. The same instance serves both the
    /// `Storage` interface and the counter flush sink.
    pub async fn create() -> Result<(Arc<dyn Storage>, Arc<dyn ClickSink>)> {
        let config = get_config();

        match config.storage.backend.as_str() {
            "memory" => {
                let storage = Arc::new(MemoryStorage::new());
                Ok((
                    Arc::clone(&storage) as Arc<dyn Storage>,
                    storage as Arc<dyn ClickSink>,
                ))
            }
            backend => {
                let backend = backend::normalize_backend_name(backend);
                let storage = Arc::new(
                    SeaOrmStorage::new(&config.storage.database_url, &backend).await?,
                );
                Ok((
                    Arc::clone(&storage) as Arc<dyn Storage>,
                    storage as Arc<dyn ClickSink>,
                ))
            }
        }
    }
}
