//! Namespaced, time-sortable event identifiers.
//!
//! A click id is exposed to the browser (cookie + `sp_click` query param) so
//! merchant pages can tag completed orders with it; the embedded millisecond
//! timestamp gives coarse chronological ordering without a database round
//! trip.

use uuid::Uuid;

pub const CLICK_NAMESPACE: &str = "sp";
pub const CONVERSION_NAMESPACE: &str = "cv";

/// Build an identifier of the form `{namespace}_{millis}_{8 hex chars}`.
pub fn new_event_id(namespace: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", namespace, millis, &uuid[..8])
}

pub fn new_click_id() -> String {
    new_event_id(CLICK_NAMESPACE)
}

pub fn new_conversion_id() -> String {
    new_event_id(CONVERSION_NAMESPACE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_click_id_shape() {
        let id = new_click_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sp");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_conversion_id_namespace() {
        assert!(new_conversion_id().starts_with("cv_"));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_click_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_timestamp_component_is_current() {
        let before = chrono::Utc::now().timestamp_millis();
        let id = new_click_id();
        let after = chrono::Utc::now().timestamp_millis();

        let millis: i64 = id.split('_').nth(1).unwrap().parse().unwrap();
        assert!(millis >= before && millis <= after);
    }
}
