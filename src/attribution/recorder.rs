//! Click recorder: dedup check, event insert, counter increments.
//!
//! The redirect path invokes this fire-and-forget; the callback endpoints
//! await it because their responses carry the computed uniqueness flag.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::attribution::{ClickCounterManager, ClickSource, CounterKey, dedup};
use crate::config::get_config;
use crate::errors::Result;
use crate::storage::{ClickEvent, Storage, TrackingLink};
use crate::utils::truncate_chars;

/// Inputs for one click recording: the resolved link, the generated click
/// id, and the request metadata captured at the edge.
#[derive(Debug, Clone)]
pub struct RecordedClick {
    pub link: TrackingLink,
    pub click_id: String,
    pub source: ClickSource,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
}

#[derive(Clone)]
pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
    counters: ClickCounterManager,
}

impl ClickRecorder {
    pub fn new(storage: Arc<dyn Storage>, counters: ClickCounterManager) -> Self {
        Self { storage, counters }
    }

    /// Record one click: dedup check, insert the event row, and (only for
    /// unique clicks) buffer the link / campaign counter increments.
    /// Returns the computed uniqueness flag.
    pub async fn record(&self, recorded: RecordedClick) -> Result<bool> {
        let config = get_config();
        let now = Utc::now();
        let max_len = config.tracking.user_agent_max_len;

        let user_agent = recorded
            .user_agent
            .map(|ua| truncate_chars(&ua, max_len));
        let referer = recorded.referer.map(|r| truncate_chars(&r, max_len));

        let is_unique = dedup::is_unique_click(
            self.storage.as_ref(),
            &recorded.link.id,
            recorded.ip_address.as_deref(),
            user_agent.as_deref(),
            now,
        )
        .await?;

        let link = recorded.link;
        let click = ClickEvent {
            click_id: recorded.click_id,
            tracking_link_id: link.id.clone(),
            seller_id: link.seller_id.clone(),
            campaign_id: link.campaign_id.clone(),
            ip_address: recorded.ip_address,
            user_agent,
            referer,
            fbp: recorded.fbp,
            fbc: recorded.fbc,
            utm_source: link.utm_source.clone(),
            utm_medium: link.utm_medium.clone(),
            utm_campaign: link.utm_campaign.clone(),
            source: recorded.source,
            is_unique,
            is_converted: false,
            converted_at: None,
            created_at: now,
        };

        self.storage.insert_click(click).await?;

        if is_unique {
            self.counters.increment(CounterKey::Link(link.id.clone()));
            if let Some(campaign_id) = link.campaign_id {
                self.counters.increment(CounterKey::Campaign(campaign_id));
            }
        }

        Ok(is_unique)
    }

    /// Fire-and-forget recording for the redirect path. The redirect
    /// response must never wait on (or observe a failure of) recording, so
    /// the work runs on a detached task and errors are logged and dropped.
    pub fn record_detached(&self, recorded: RecordedClick) {
        let recorder = self.clone();
        tokio::spawn(async move {
            let link_id = recorded.link.id.clone();
            if let Err(e) = recorder.record(recorded).await {
                warn!("click recording failed for link {}: {}", link_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::counter::ClickSink;
    use crate::config::init_config;
    use crate::storage::{LinkStatus, MemoryStorage};
    use tokio::time::Duration;

    fn active_link(id: &str, campaign: Option<&str>) -> TrackingLink {
        TrackingLink {
            id: id.to_string(),
            seller_id: "seller1".to_string(),
            campaign_id: campaign.map(String::from),
            destination_url: "https://shop.example/p/1".to_string(),
            utm_source: Some("kakao".to_string()),
            utm_medium: Some("social".to_string()),
            utm_campaign: Some("spring_sale".to_string()),
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

    fn recorded(link: &TrackingLink, click_id: &str, ip: &str, ua: &str) -> RecordedClick {
        RecordedClick {
            link: link.clone(),
            click_id: click_id.to_string(),
            source: ClickSource::TrackingRedirect,
            ip_address: Some(ip.to_string()),
            user_agent: Some(ua.to_string()),
            referer: Some("https://ads.example/campaign".to_string()),
            fbp: Some("fb.1.123.456".to_string()),
            fbc: None,
        }
    }

    fn setup(storage: Arc<MemoryStorage>) -> ClickRecorder {
        let counters = ClickCounterManager::new(
            Arc::clone(&storage) as Arc<dyn ClickSink>,
            Duration::from_secs(3600),
            usize::MAX,
        );
        ClickRecorder::new(storage, counters)
    }

    #[tokio::test]
    async fn test_first_click_unique_and_counted() {
        init_config();
        let storage = Arc::new(MemoryStorage::new());
        let link = active_link("l1", Some("c1"));
        storage.insert_link(link.clone()).await.unwrap();
        let recorder = setup(Arc::clone(&storage));

        let unique = recorder
            .record(recorded(&link, "sp_1_aaaa0001", "1.2.3.4", "UA-X"))
            .await
            .unwrap();
        assert!(unique);

        let click = storage.get_click("sp_1_aaaa0001").await.unwrap().unwrap();
        assert!(click.is_unique);
        assert!(!click.is_converted);
        assert_eq!(click.utm_source.as_deref(), Some("kakao"));
        assert_eq!(click.campaign_id.as_deref(), Some("c1"));
        assert_eq!(click.fbp.as_deref(), Some("fb.1.123.456"));

        recorder.counters.flush().await;
        let stored = storage.get_link("l1").await.unwrap().unwrap();
        assert_eq!(stored.click_count, 1);
        assert!(stored.last_click_at.is_some());
        assert_eq!(storage.campaign_clicks("c1"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_click_inserts_row_without_increment() {
        init_config();
        let storage = Arc::new(MemoryStorage::new());
        let link = active_link("l2", None);
        storage.insert_link(link.clone()).await.unwrap();
        let recorder = setup(Arc::clone(&storage));

        let first = recorder
            .record(recorded(&link, "sp_1_bbbb0001", "1.2.3.4", "UA-X"))
            .await
            .unwrap();
        let second = recorder
            .record(recorded(&link, "sp_1_bbbb0002", "1.2.3.4", "UA-X"))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);

        // both rows exist for audit, only one increment was buffered
        assert_eq!(storage.clicks_for_link("l2").await.unwrap().len(), 2);
        recorder.counters.flush().await;
        let stored = storage.get_link("l2").await.unwrap().unwrap();
        assert_eq!(stored.click_count, 1);
    }

    #[tokio::test]
    async fn test_user_agent_truncated_before_dedup_and_store() {
        init_config();
        let storage = Arc::new(MemoryStorage::new());
        let link = active_link("l3", None);
        storage.insert_link(link.clone()).await.unwrap();
        let recorder = setup(Arc::clone(&storage));

        let long_ua = "M".repeat(800);
        recorder
            .record(recorded(&link, "sp_1_cccc0001", "1.2.3.4", &long_ua))
            .await
            .unwrap();

        let click = storage.get_click("sp_1_cccc0001").await.unwrap().unwrap();
        assert_eq!(click.user_agent.as_ref().unwrap().chars().count(), 500);

        // a second click whose UA differs only beyond the truncation bound
        // still matches the stored triple
        let long_ua_tail = format!("{}{}", "M".repeat(800), "different-tail");
        let second = recorder
            .record(recorded(&link, "sp_1_cccc0002", "1.2.3.4", &long_ua_tail))
            .await
            .unwrap();
        assert!(!second);
    }

    #[tokio::test]
    async fn test_detached_recording_swallows_missing_storage_rows() {
        init_config();
        let storage = Arc::new(MemoryStorage::new());
        let link = active_link("l4", None);
        // link intentionally not inserted; memory backend still accepts the
        // click row, so this only exercises the detached path end to end
        let recorder = Arc::new(setup(Arc::clone(&storage)));

        recorder.record_detached(recorded(&link, "sp_1_dddd0001", "1.2.3.4", "UA-X"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(storage.clicks_for_link("l4").await.unwrap().len(), 1);
    }
}
