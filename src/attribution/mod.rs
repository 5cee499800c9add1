//! Click attribution core: identifier generation, dedup policy, buffered
//! counters, the click recorder, and destination URL construction.

pub mod click_id;
pub mod cookies;
pub mod counter;
pub mod dedup;
pub mod destination;
pub mod recorder;

pub use counter::{ClickCounterManager, ClickSink, CounterKey};
pub use recorder::{ClickRecorder, RecordedClick};

use std::fmt;

/// Origin of a click event. The redirect and callback paths write identical
/// rows apart from this tag, so downstream reporting can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickSource {
    /// `GET /t/{id}` server redirect
    TrackingRedirect,
    /// `GET /go/{id}` organic-channel redirect
    OrganicRedirect,
    /// `GET /tt/{slug}/{code}` video-code redirect
    VideoRedirect,
    /// Bridge-shop interstitial callback
    BridgeShop,
    /// Loading-page interstitial callback
    LoadingPage,
}

impl ClickSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickSource::TrackingRedirect => "t_redirect",
            ClickSource::OrganicRedirect => "go_redirect",
            ClickSource::VideoRedirect => "tt_redirect",
            ClickSource::BridgeShop => "bridge_shop",
            ClickSource::LoadingPage => "loading_page",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "t_redirect" => Some(ClickSource::TrackingRedirect),
            "go_redirect" => Some(ClickSource::OrganicRedirect),
            "tt_redirect" => Some(ClickSource::VideoRedirect),
            "bridge_shop" => Some(ClickSource::BridgeShop),
            "loading_page" => Some(ClickSource::LoadingPage),
            _ => None,
        }
    }
}

impl fmt::Display for ClickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_roundtrip() {
        for source in [
            ClickSource::TrackingRedirect,
            ClickSource::OrganicRedirect,
            ClickSource::VideoRedirect,
            ClickSource::BridgeShop,
            ClickSource::LoadingPage,
        ] {
            assert_eq!(ClickSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(ClickSource::parse("pixel"), None);
    }
}
