//! In-memory storage backend.
//!
//! Backs tests and local development; mirrors the SeaORM backend's
//! observable behavior, including the counter flush semantics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::attribution::{ClickSink, CounterKey};
use crate::errors::{Result, ServiceError};
use crate::storage::{
    ClickEvent, Conversion, ForwardRecord, SellerAccount, Storage, TrackingLink,
};

pub struct MemoryStorage {
    links: DashMap<String, TrackingLink>,
    sellers: DashMap<String, SellerAccount>,
    conversions: DashMap<String, Conversion>,
    campaign_clicks: DashMap<String, i64>,
    /// Insertion-ordered, like the append-only table it stands in for.
    clicks: RwLock<Vec<ClickEvent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            sellers: DashMap::new(),
            conversions: DashMap::new(),
            campaign_clicks: DashMap::new(),
            clicks: RwLock::new(Vec::new()),
        }
    }

    /// Flushed campaign counter value (test observability).
    pub fn campaign_clicks(&self, campaign_id: &str) -> i64 {
        self.campaign_clicks
            .get(campaign_id)
            .map(|v| *v)
            .unwrap_or(0)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_link(&self, id: &str) -> Result<Option<TrackingLink>> {
        Ok(self.links.get(id).map(|l| l.clone()))
    }

    async fn get_link_by_video(
        &self,
        store_slug: &str,
        video_code: &str,
    ) -> Result<Option<TrackingLink>> {
        Ok(self
            .links
            .iter()
            .find(|l| {
                l.store_slug.as_deref() == Some(store_slug)
                    && l.video_code.as_deref() == Some(video_code)
            })
            .map(|l| l.clone()))
    }

    async fn insert_link(&self, link: TrackingLink) -> Result<()> {
        self.links.insert(link.id.clone(), link);
        Ok(())
    }

    async fn insert_seller(&self, seller: SellerAccount) -> Result<()> {
        self.sellers.insert(seller.id.clone(), seller);
        Ok(())
    }

    async fn insert_click(&self, click: ClickEvent) -> Result<()> {
        self.clicks.write().await.push(click);
        Ok(())
    }

    async fn get_click(&self, click_id: &str) -> Result<Option<ClickEvent>> {
        Ok(self
            .clicks
            .read()
            .await
            .iter()
            .find(|c| c.click_id == click_id)
            .cloned())
    }

    async fn clicks_for_link(&self, link_id: &str) -> Result<Vec<ClickEvent>> {
        Ok(self
            .clicks
            .read()
            .await
            .iter()
            .filter(|c| c.tracking_link_id == link_id)
            .cloned()
            .collect())
    }

    async fn has_recent_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.clicks.read().await.iter().any(|c| {
            c.tracking_link_id == link_id
                && c.ip_address.as_deref() == ip_address
                && c.user_agent.as_deref() == user_agent
                && c.created_at >= since
        }))
    }

    async fn latest_click(&self, link_id: &str) -> Result<Option<ClickEvent>> {
        Ok(self
            .clicks
            .read()
            .await
            .iter()
            .filter(|c| c.tracking_link_id == link_id)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn mark_click_converted(&self, click_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut clicks = self.clicks.write().await;
        if let Some(click) = clicks.iter_mut().find(|c| c.click_id == click_id) {
            click.is_converted = true;
            click.converted_at = Some(at);
        }
        Ok(())
    }

    async fn increment_link_conversions(&self, link_id: &str) -> Result<()> {
        match self.links.get_mut(link_id) {
            Some(mut link) => {
                link.conversion_count += 1;
                Ok(())
            }
            None => Err(ServiceError::not_found(format!(
                "tracking link not found: {}",
                link_id
            ))),
        }
    }

    async fn get_seller(&self, id: &str) -> Result<Option<SellerAccount>> {
        Ok(self.sellers.get(id).map(|s| s.clone()))
    }

    async fn get_conversion(&self, id: &str) -> Result<Option<Conversion>> {
        Ok(self.conversions.get(id).map(|c| c.clone()))
    }

    async fn insert_conversion(&self, conversion: Conversion) -> Result<()> {
        self.conversions.insert(conversion.id.clone(), conversion);
        Ok(())
    }

    async fn record_forward_result(
        &self,
        conversion_id: &str,
        record: ForwardRecord,
    ) -> Result<()> {
        match self.conversions.get_mut(conversion_id) {
            Some(mut conversion) => {
                conversion.meta_sent = record.meta_sent;
                conversion.meta_sent_at = record.meta_sent_at;
                conversion.fb_trace_id = record.fb_trace_id;
                conversion.events_received = record.events_received;
                Ok(())
            }
            None => Err(ServiceError::not_found(format!(
                "conversion not found: {}",
                conversion_id
            ))),
        }
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[async_trait]
impl ClickSink for MemoryStorage {
    async fn flush_clicks(&self, updates: Vec<(CounterKey, usize)>) -> anyhow::Result<()> {
        let now = Utc::now();
        for (key, count) in updates {
            match key {
                CounterKey::Link(id) => {
                    if let Some(mut link) = self.links.get_mut(&id) {
                        link.click_count += count as i64;
                        link.last_click_at = Some(now);
                    }
                }
                CounterKey::Campaign(id) => {
                    *self.campaign_clicks.entry(id).or_insert(0) += count as i64;
                }
            }
        }
        Ok(())
    }
}
