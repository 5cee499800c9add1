//! Redirect dispatchers for the three link variants.
//!
//! The contract on every path here: the browser always ends up redirected
//! somewhere. Lookup failures, inactive links, and broken destination URLs
//! all degrade to the site root or the not-found page, never to an error
//! body, and recording runs detached so it cannot delay or fail the
//! response.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::{debug, error};
use woothee::parser::Parser;

use crate::attribution::click_id::new_click_id;
use crate::attribution::cookies::{FBC_COOKIE, FBP_COOKIE, build_attribution_cookies};
use crate::attribution::destination::build_destination_url;
use crate::attribution::{ClickRecorder, ClickSource, RecordedClick};
use crate::cache::LinkCache;
use crate::config::get_config;
use crate::storage::{Storage, TrackingLink};
use crate::utils::ip::extract_client_ip;

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_tracking(
        req: HttpRequest,
        path: web::Path<String>,
        storage: web::Data<Arc<dyn Storage>>,
        cache: web::Data<LinkCache>,
        recorder: web::Data<Arc<ClickRecorder>>,
    ) -> impl Responder {
        let link_id = path.into_inner();
        let link = match cache.get_or_load(storage.get_ref().as_ref(), &link_id).await {
            Ok(link) => link,
            Err(e) => {
                error!("Link lookup failed for {}: {}", link_id, e);
                return Self::root_redirect();
            }
        };
        Self::dispatch(&req, link, ClickSource::TrackingRedirect, &recorder)
    }

    pub async fn handle_organic(
        req: HttpRequest,
        path: web::Path<String>,
        storage: web::Data<Arc<dyn Storage>>,
        cache: web::Data<LinkCache>,
        recorder: web::Data<Arc<ClickRecorder>>,
    ) -> impl Responder {
        let link_id = path.into_inner();
        let link = match cache.get_or_load(storage.get_ref().as_ref(), &link_id).await {
            Ok(link) => link,
            Err(e) => {
                error!("Link lookup failed for {}: {}", link_id, e);
                return Self::root_redirect();
            }
        };
        Self::dispatch(&req, link, ClickSource::OrganicRedirect, &recorder)
    }

    pub async fn handle_video(
        req: HttpRequest,
        path: web::Path<(String, String)>,
        storage: web::Data<Arc<dyn Storage>>,
        recorder: web::Data<Arc<ClickRecorder>>,
    ) -> impl Responder {
        let (store_slug, video_code) = path.into_inner();
        let link = match storage.get_link_by_video(&store_slug, &video_code).await {
            Ok(link) => link,
            Err(e) => {
                error!(
                    "Video link lookup failed for {}/{}: {}",
                    store_slug, video_code, e
                );
                return Self::root_redirect();
            }
        };

        // crawlers get the redirect but never a click row
        let user_agent = Self::header(&req, header::USER_AGENT);
        if let Some(ref ua) = user_agent {
            if is_crawler(ua) {
                debug!("Crawler on /tt/{}/{}, skipping recording", store_slug, video_code);
                return match link {
                    Some(link) if link.status.is_active() => {
                        let click_id = new_click_id();
                        Self::redirect_to_destination(&link, &click_id, &[])
                    }
                    Some(_) => Self::root_redirect(),
                    None => Self::not_found_redirect(),
                };
            }
        }

        Self::dispatch(&req, link, ClickSource::VideoRedirect, &recorder)
    }

    /// Shared tail of all redirect variants: validate the link, spawn
    /// recording, answer 302 with attribution cookies.
    fn dispatch(
        req: &HttpRequest,
        link: Option<TrackingLink>,
        source: ClickSource,
        recorder: &Arc<ClickRecorder>,
    ) -> HttpResponse {
        let Some(link) = link else {
            return Self::not_found_redirect();
        };
        if !link.status.is_active() {
            debug!("Link {} is {}, redirecting to root", link.id, link.status.as_str());
            return Self::root_redirect();
        }

        let click_id = new_click_id();
        let now = Utc::now();

        recorder.record_detached(RecordedClick {
            link: link.clone(),
            click_id: click_id.clone(),
            source,
            ip_address: extract_client_ip(req),
            user_agent: Self::header(req, header::USER_AGENT),
            referer: Self::header(req, header::REFERER),
            fbp: req.cookie(FBP_COOKIE).map(|c| c.value().to_string()),
            fbc: req.cookie(FBC_COOKIE).map(|c| c.value().to_string()),
        });

        let click_time = match source {
            ClickSource::OrganicRedirect => Some(now),
            _ => None,
        };
        let cookies = build_attribution_cookies(&click_id, &link.id, click_time);

        Self::redirect_to_destination(&link, &click_id, &cookies)
    }

    fn redirect_to_destination(
        link: &TrackingLink,
        click_id: &str,
        cookies: &[actix_web::cookie::Cookie<'static>],
    ) -> HttpResponse {
        let destination = build_destination_url(link, click_id).unwrap_or_else(|| {
            error!("Unusable destination URL on link {}, using site root", link.id);
            get_config().tracking.site_root_url.clone()
        });

        let mut builder = HttpResponse::Found();
        builder.insert_header((header::LOCATION, destination));
        for cookie in cookies {
            builder.cookie(cookie.clone());
        }
        builder.finish()
    }

    fn header(req: &HttpRequest, name: header::HeaderName) -> Option<String> {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(String::from)
    }

    fn not_found_redirect() -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, get_config().tracking.not_found_url.clone()))
            .finish()
    }

    fn root_redirect() -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, get_config().tracking.site_root_url.clone()))
            .finish()
    }
}

static UA_PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// Crawler detection via user-agent parsing; unparseable strings are
/// treated as browsers.
fn is_crawler(user_agent: &str) -> bool {
    let result = UA_PARSER.parse(user_agent).unwrap_or_default();
    result.category == "crawler"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_crawler() {
        assert!(is_crawler(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        ));
        assert!(!is_crawler(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15"
        ));
        assert!(!is_crawler(""));
    }
}
