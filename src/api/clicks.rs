//! Click-recording callbacks for interstitial flows.
//!
//! Unlike the redirect paths these are synchronous request/response APIs:
//! the bridge-shop page wants the generated click id back, and the loading
//! page wants the uniqueness flag. Both produce the same click-event shape
//! as the server redirects, apart from the source tag.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::attribution::click_id::new_click_id;
use crate::attribution::cookies::{FBC_COOKIE, FBP_COOKIE};
use crate::attribution::{ClickRecorder, ClickSource, RecordedClick};
use crate::storage::{Storage, TrackingLink};
use crate::utils::ip::extract_client_ip;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeClickRequest {
    pub tracking_link_id: String,
    pub store: Option<String>,
    pub product: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeClickResponse {
    pub success: bool,
    pub click_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingClickRequest {
    pub tracking_link_id: String,
    pub click_id: String,
    pub referer: Option<String>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingClickResponse {
    pub success: bool,
    pub is_unique: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

pub struct ClickApiService {}

impl ClickApiService {
    /// `POST /api/clicks/bridge` — bridge-shop interstitial click.
    pub async fn record_bridge_click(
        req: HttpRequest,
        body: web::Json<BridgeClickRequest>,
        storage: web::Data<Arc<dyn Storage>>,
        recorder: web::Data<Arc<ClickRecorder>>,
    ) -> impl Responder {
        let body = body.into_inner();

        let link = match Self::resolve_link(storage.get_ref().as_ref(), &body.tracking_link_id)
            .await
        {
            Ok(link) => link,
            Err(response) => return response,
        };

        debug!(
            "Bridge click on link {} (store: {:?}, product: {:?}, action: {:?})",
            link.id, body.store, body.product, body.action
        );

        let click_id = new_click_id();
        let recorded = RecordedClick {
            link,
            click_id: click_id.clone(),
            source: ClickSource::BridgeShop,
            ip_address: extract_client_ip(&req),
            user_agent: Self::header(&req, header::USER_AGENT),
            referer: Self::header(&req, header::REFERER),
            fbp: req.cookie(FBP_COOKIE).map(|c| c.value().to_string()),
            fbc: req.cookie(FBC_COOKIE).map(|c| c.value().to_string()),
        };

        match recorder.record(recorded).await {
            Ok(_) => HttpResponse::Ok().json(BridgeClickResponse {
                success: true,
                click_id,
            }),
            Err(e) => {
                error!("Bridge click recording failed: {}", e);
                HttpResponse::InternalServerError()
                    .json(ApiErrorResponse::new("Failed to record click"))
            }
        }
    }

    /// `POST /api/clicks/loading` — loading-page click with a
    /// client-generated click id. Client-captured `fbp`/`fbc` win over the
    /// request cookies, since the page may run before first-party cookies
    /// settle.
    pub async fn record_loading_click(
        req: HttpRequest,
        body: web::Json<LoadingClickRequest>,
        storage: web::Data<Arc<dyn Storage>>,
        recorder: web::Data<Arc<ClickRecorder>>,
    ) -> impl Responder {
        let body = body.into_inner();

        if body.click_id.trim().is_empty() {
            return HttpResponse::BadRequest().json(ApiErrorResponse::new("clickId is required"));
        }

        let link = match Self::resolve_link(storage.get_ref().as_ref(), &body.tracking_link_id)
            .await
        {
            Ok(link) => link,
            Err(response) => return response,
        };

        let recorded = RecordedClick {
            link,
            click_id: body.click_id,
            source: ClickSource::LoadingPage,
            ip_address: extract_client_ip(&req),
            user_agent: Self::header(&req, header::USER_AGENT),
            referer: body.referer.or_else(|| Self::header(&req, header::REFERER)),
            fbp: body
                .fbp
                .or_else(|| req.cookie(FBP_COOKIE).map(|c| c.value().to_string())),
            fbc: body
                .fbc
                .or_else(|| req.cookie(FBC_COOKIE).map(|c| c.value().to_string())),
        };

        match recorder.record(recorded).await {
            Ok(is_unique) => HttpResponse::Ok().json(LoadingClickResponse {
                success: true,
                is_unique,
            }),
            Err(e) => {
                error!("Loading-page click recording failed: {}", e);
                HttpResponse::InternalServerError()
                    .json(ApiErrorResponse::new("Failed to record click"))
            }
        }
    }

    /// Resolve and gate a link for the callback paths: 404 when missing,
    /// 403 when not active, 500 on storage failure.
    async fn resolve_link(
        storage: &dyn Storage,
        link_id: &str,
    ) -> Result<TrackingLink, HttpResponse> {
        match storage.get_link(link_id).await {
            Ok(Some(link)) if link.status.is_active() => Ok(link),
            Ok(Some(_)) => Err(HttpResponse::Forbidden()
                .json(ApiErrorResponse::new("Tracking link is not active"))),
            Ok(None) => {
                Err(HttpResponse::NotFound().json(ApiErrorResponse::new("Tracking link not found")))
            }
            Err(e) => {
                error!("Link lookup failed for {}: {}", link_id, e);
                Err(HttpResponse::InternalServerError()
                    .json(ApiErrorResponse::new("Storage unavailable")))
            }
        }
    }

    fn header(req: &HttpRequest, name: header::HeaderName) -> Option<String> {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(String::from)
    }
}
