//! TrackingLink lookup cache.
//!
//! Hot redirects resolve from an in-process moka cache; misses fall through
//! to storage and populate it. Counter updates bypass this cache entirely
//! (the cached copy's counts go stale within the TTL, which nothing on the
//! redirect path reads).

use moka::future::Cache;

use crate::config::get_config;
use crate::errors::Result;
use crate::storage::{Storage, TrackingLink};

#[derive(Clone)]
pub struct LinkCache {
    inner: Cache<String, TrackingLink>,
}

impl LinkCache {
    pub fn new() -> Self {
        let config = get_config();
        let inner = Cache::builder()
            .max_capacity(config.cache.link_capacity)
            .time_to_live(std::time::Duration::from_secs(config.cache.link_ttl_secs))
            .build();
        Self { inner }
    }

    /// Cached link lookup; a miss reads storage and fills the cache.
    /// Negative results are not cached, a nonexistent id stays a storage
    /// round trip.
    pub async fn get_or_load(
        &self,
        storage: &dyn Storage,
        id: &str,
    ) -> Result<Option<TrackingLink>> {
        if let Some(link) = self.inner.get(id).await {
            return Ok(Some(link));
        }

        match storage.get_link(id).await? {
            Some(link) => {
                self.inner.insert(id.to_string(), link.clone()).await;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }

    pub async fn invalidate(&self, id: &str) {
        self.inner.invalidate(id).await;
    }
}

impl Default for LinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::init_config;
    use crate::storage::{LinkStatus, MemoryStorage};
    use chrono::Utc;

    fn link(id: &str) -> TrackingLink {
        TrackingLink {
            id: id.to_string(),
            seller_id: "seller1".to_string(),
            campaign_id: None,
            destination_url: "https://shop.example/p/1".to_string(),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            status: LinkStatus::Active,
            click_count: 0,
            conversion_count: 0,
            last_click_at: None,
            store_slug: None,
            video_code: None,
            meta_pixel_id: None,
            meta_access_token: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        init_config();
        let storage = MemoryStorage::new();
        storage.insert_link(link("l1")).await.unwrap();

        let cache = LinkCache::new();
        assert!(cache.get_or_load(&storage, "l1").await.unwrap().is_some());

        // served from cache even after the storage row disappears
        let empty = MemoryStorage::new();
        assert!(cache.get_or_load(&empty, "l1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_negative_results_not_cached() {
        init_config();
        let storage = MemoryStorage::new();
        let cache = LinkCache::new();

        assert!(cache.get_or_load(&storage, "l1").await.unwrap().is_none());

        storage.insert_link(link("l1")).await.unwrap();
        assert!(cache.get_or_load(&storage, "l1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate() {
        init_config();
        let storage = MemoryStorage::new();
        storage.insert_link(link("l1")).await.unwrap();

        let cache = LinkCache::new();
        cache.get_or_load(&storage, "l1").await.unwrap();
        cache.invalidate("l1").await;

        let empty = MemoryStorage::new();
        assert!(cache.get_or_load(&empty, "l1").await.unwrap().is_none());
    }
}
