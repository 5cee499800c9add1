//! Click deduplication policy.
//!
//! A click is unique iff no event for the same (tracking link, IP,
//! user-agent) triple was recorded within the trailing window (one hour by
//! default). The triple is matched on exact strings, with the same
//! truncation the recorder applies. Shared-IP users with identical UA
//! strings inside the window are under-counted on purpose; the policy
//! trades that for not fingerprinting devices.

use chrono::{DateTime, Duration, Utc};

use crate::config::get_config;
use crate::errors::Result;
use crate::storage::Storage;

/// Start of the dedup lookback window for a click happening at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(get_config().tracking.dedup_window_secs)
}

/// Decide whether a click is unique. Every click still produces its own
/// event row; only counter increments hinge on this.
pub async fn is_unique_click(
    storage: &dyn Storage,
    link_id: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let duplicate = storage
        .has_recent_click(link_id, ip_address, user_agent, window_start(now))
        .await?;
    Ok(!duplicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::ClickSource;
    use crate::config::init_config;
    use crate::storage::{ClickEvent, MemoryStorage, Storage};

    fn click(link_id: &str, ip: &str, ua: &str, created_at: DateTime<Utc>) -> ClickEvent {
        ClickEvent {
            click_id: crate::attribution::click_id::new_click_id(),
            tracking_link_id: link_id.to_string(),
            seller_id: "seller1".to_string(),
            campaign_id: None,
            ip_address: Some(ip.to_string()),
            user_agent: Some(ua.to_string()),
            referer: None,
            fbp: None,
            fbc: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            source: ClickSource::TrackingRedirect,
            is_unique: true,
            is_converted: false,
            converted_at: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_first_click_is_unique() {
        init_config();
        let storage = MemoryStorage::new();

        let unique = is_unique_click(&storage, "l1", Some("1.2.3.4"), Some("UA-X"), Utc::now())
            .await
            .unwrap();
        assert!(unique);
    }

    #[tokio::test]
    async fn test_repeat_within_window_is_duplicate() {
        init_config();
        let storage = MemoryStorage::new();
        let now = Utc::now();

        storage
            .insert_click(click("l1", "1.2.3.4", "UA-X", now - Duration::seconds(10)))
            .await
            .unwrap();

        let unique = is_unique_click(&storage, "l1", Some("1.2.3.4"), Some("UA-X"), now)
            .await
            .unwrap();
        assert!(!unique);
    }

    #[tokio::test]
    async fn test_click_outside_window_is_unique_again() {
        init_config();
        let storage = MemoryStorage::new();
        let now = Utc::now();

        storage
            .insert_click(click("l1", "1.2.3.4", "UA-X", now - Duration::minutes(61)))
            .await
            .unwrap();

        let unique = is_unique_click(&storage, "l1", Some("1.2.3.4"), Some("UA-X"), now)
            .await
            .unwrap();
        assert!(unique);
    }

    #[tokio::test]
    async fn test_triple_must_match_exactly() {
        init_config();
        let storage = MemoryStorage::new();
        let now = Utc::now();

        storage
            .insert_click(click("l1", "1.2.3.4", "UA-X", now - Duration::seconds(10)))
            .await
            .unwrap();

        // different IP
        assert!(
            is_unique_click(&storage, "l1", Some("5.6.7.8"), Some("UA-X"), now)
                .await
                .unwrap()
        );
        // different UA
        assert!(
            is_unique_click(&storage, "l1", Some("1.2.3.4"), Some("UA-Y"), now)
                .await
                .unwrap()
        );
        // different link
        assert!(
            is_unique_click(&storage, "l2", Some("1.2.3.4"), Some("UA-X"), now)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_absent_values_participate_in_match() {
        init_config();
        let storage = MemoryStorage::new();
        let now = Utc::now();

        let mut no_ua = click("l1", "1.2.3.4", "unused", now - Duration::seconds(10));
        no_ua.user_agent = None;
        storage.insert_click(no_ua).await.unwrap();

        assert!(
            !is_unique_click(&storage, "l1", Some("1.2.3.4"), None, now)
                .await
                .unwrap()
        );
        assert!(
            is_unique_click(&storage, "l1", Some("1.2.3.4"), Some("UA-X"), now)
                .await
                .unwrap()
        );
    }
}
