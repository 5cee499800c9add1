//! SeaORM storage backend, supporting SQLite, MySQL/MariaDB, and
//! PostgreSQL. Reads live in `query`, writes in `mutations`, the counter
//! flush in `click_sink`.

mod click_sink;
mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::get_config;
use crate::errors::{Result, ServiceError};
use crate::storage::{
    ClickEvent, Conversion, ForwardRecord, SellerAccount, Storage, TrackingLink,
};

pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// Map backend aliases onto the canonical names.
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ServiceError::database_config("DATABASE_URL is not set"));
        }

        let config = get_config();
        let retry_config = retry::RetryConfig {
            max_retries: config.storage.retry_count,
            ..retry::RetryConfig::default()
        };

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        };

        run_migrations(&storage.db).await?;

        info!(
            "{} storage initialized",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// Direct connection access, for callers outside the `Storage` surface.
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn get_link(&self, id: &str) -> Result<Option<TrackingLink>> {
        self.find_link(id).await
    }

    async fn get_link_by_video(
        &self,
        store_slug: &str,
        video_code: &str,
    ) -> Result<Option<TrackingLink>> {
        self.find_link_by_video(store_slug, video_code).await
    }

    async fn insert_link(&self, link: TrackingLink) -> Result<()> {
        self.store_link(link).await
    }

    async fn insert_seller(&self, seller: SellerAccount) -> Result<()> {
        self.store_seller(seller).await
    }

    async fn insert_click(&self, click: ClickEvent) -> Result<()> {
        self.store_click(click).await
    }

    async fn get_click(&self, click_id: &str) -> Result<Option<ClickEvent>> {
        self.find_click(click_id).await
    }

    async fn clicks_for_link(&self, link_id: &str) -> Result<Vec<ClickEvent>> {
        self.find_clicks_for_link(link_id).await
    }

    async fn has_recent_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        self.exists_recent_click(link_id, ip_address, user_agent, since)
            .await
    }

    async fn latest_click(&self, link_id: &str) -> Result<Option<ClickEvent>> {
        self.find_latest_click(link_id).await
    }

    async fn mark_click_converted(&self, click_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.set_click_converted(click_id, at).await
    }

    async fn increment_link_conversions(&self, link_id: &str) -> Result<()> {
        self.add_link_conversion(link_id).await
    }

    async fn get_seller(&self, id: &str) -> Result<Option<SellerAccount>> {
        self.find_seller(id).await
    }

    async fn get_conversion(&self, id: &str) -> Result<Option<Conversion>> {
        self.find_conversion(id).await
    }

    async fn insert_conversion(&self, conversion: Conversion) -> Result<()> {
        self.store_conversion(conversion).await
    }

    async fn record_forward_result(
        &self,
        conversion_id: &str,
        record: ForwardRecord,
    ) -> Result<()> {
        self.annotate_conversion(conversion_id, record).await
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
