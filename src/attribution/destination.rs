//! Destination URL construction.
//!
//! The outbound URL is the stored destination plus the link's attribution
//! parameters and the click id. Naver smart-store pages ignore UTM naming
//! and read the NT-style parameters instead, so the parameter names are
//! picked per destination kind.

use url::Url;

use crate::storage::TrackingLink;
use crate::utils::url::validate_destination_url;

/// Query key carrying the click id on every outbound URL.
pub const CLICK_QUERY_KEY: &str = "sp_click";

/// Storefront hosts that require NT-style attribution parameter naming.
const SMARTSTORE_HOSTS: &[&str] = &[
    "smartstore.naver.com",
    "brand.naver.com",
    "shopping.naver.com",
];

/// Recognized destination kinds; each carries its own parameter naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    SmartStore,
    Generic,
}

impl DestinationKind {
    pub fn detect(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        for known in SMARTSTORE_HOSTS {
            if host == *known || host.ends_with(&format!(".{}", known)) {
                return DestinationKind::SmartStore;
            }
        }
        DestinationKind::Generic
    }

    /// Attribution parameters for this destination kind, in append order.
    fn attribution_params(&self, link: &TrackingLink) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        match self {
            DestinationKind::Generic => {
                if let Some(ref source) = link.utm_source {
                    params.push(("utm_source", source.clone()));
                }
                if let Some(ref medium) = link.utm_medium {
                    params.push(("utm_medium", medium.clone()));
                }
                if let Some(ref campaign) = link.utm_campaign {
                    params.push(("utm_campaign", campaign.clone()));
                }
            }
            DestinationKind::SmartStore => {
                if let Some(ref source) = link.utm_source {
                    params.push(("nt_source", source.clone()));
                }
                if let Some(ref medium) = link.utm_medium {
                    params.push(("nt_medium", medium.clone()));
                }
                if let Some(ref campaign) = link.utm_campaign {
                    params.push(("nt_detail", campaign.clone()));
                }
                if let Some(ref code) = link.video_code {
                    params.push(("nt_keyword", code.clone()));
                }
            }
        }
        params
    }
}

/// Build the outbound redirect URL for a link and click id. Returns `None`
/// when the stored destination does not parse; the dispatcher then falls
/// back to the site root.
pub fn build_destination_url(link: &TrackingLink, click_id: &str) -> Option<String> {
    validate_destination_url(&link.destination_url).ok()?;
    let mut url = Url::parse(link.destination_url.trim()).ok()?;

    let kind = url
        .host_str()
        .map(DestinationKind::detect)
        .unwrap_or(DestinationKind::Generic);

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in kind.attribution_params(link) {
            pairs.append_pair(key, &value);
        }
        pairs.append_pair(CLICK_QUERY_KEY, click_id);
    }

    Some(url.to_string())
}
