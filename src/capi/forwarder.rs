//! Conversion matcher / forwarder.
//!
//! On a purchase event: resolve credentials, recover attribution signals
//! from the most recent click when the caller did not supply them, send a
//! standardized Purchase event, and write the outcome back onto the
//! conversion row.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::attribution::click_id::new_conversion_id;
use crate::capi::client::ConversionTransport;
use crate::capi::types::{
    CapiCustomData, CapiEvent, CapiRequest, CapiUserData, hash_email, hash_phone,
};
use crate::config::get_config;
use crate::errors::{Result, ServiceError};
use crate::storage::{Conversion, ForwardRecord, Storage, TrackingLink};

/// Purchase notification for a tracking link. Directly supplied user data
/// wins over anything recovered from stored clicks.
#[derive(Debug, Clone, Default)]
pub struct ForwardRequest {
    pub conversion_id: Option<String>,
    pub tracking_link_id: String,
    pub order_id: String,
    pub order_amount: f64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Forwarding result. `Skipped` is the deliberate no-credentials outcome,
/// not a failure; transport errors surface as `Err` from `forward`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    Skipped,
    Sent {
        events_received: Option<i32>,
        fbtrace_id: Option<String>,
    },
}

pub struct ConversionForwarder {
    storage: Arc<dyn Storage>,
    transport: Arc<dyn ConversionTransport>,
}

impl ConversionForwarder {
    pub fn new(storage: Arc<dyn Storage>, transport: Arc<dyn ConversionTransport>) -> Self {
        Self { storage, transport }
    }

    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardOutcome> {
        let link = self
            .storage
            .get_link(&request.tracking_link_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "tracking link not found: {}",
                    request.tracking_link_id
                ))
            })?;

        // the most recent click serves both signal recovery and the
        // conversion flip; absence of any prior click is fine
        let latest_click = self.storage.latest_click(&link.id).await?;

        let conversion_id = self.resolve_conversion_row(&request, &link).await?;

        // the purchase is matched whether or not forwarding happens
        if let Some(ref click) = latest_click {
            if !click.is_converted {
                if let Err(e) = self
                    .storage
                    .mark_click_converted(&click.click_id, Utc::now())
                    .await
                {
                    warn!("Failed to flip click {} to converted: {}", click.click_id, e);
                }
            }
        }

        let Some((pixel_id, access_token)) = self.resolve_credentials(&link).await? else {
            debug!(
                "No Conversions API credentials for link {}, skipping forward",
                link.id
            );
            return Ok(ForwardOutcome::Skipped);
        };

        let fbp = request
            .fbp
            .clone()
            .or_else(|| latest_click.as_ref().and_then(|c| c.fbp.clone()));
        let fbc = request
            .fbc
            .clone()
            .or_else(|| latest_click.as_ref().and_then(|c| c.fbc.clone()));
        let client_ip = request
            .client_ip
            .clone()
            .or_else(|| latest_click.as_ref().and_then(|c| c.ip_address.clone()));
        let user_agent = request
            .user_agent
            .clone()
            .or_else(|| latest_click.as_ref().and_then(|c| c.user_agent.clone()));

        let user_data = CapiUserData {
            em: request.email.as_deref().map(|e| vec![hash_email(e)]),
            ph: request.phone.as_deref().map(|p| vec![hash_phone(p)]),
            client_ip_address: client_ip,
            client_user_agent: user_agent,
            fbp,
            fbc,
        };

        let now = Utc::now();
        // event_id embeds a wall-clock timestamp, so a retried call makes a
        // fresh id and platform-side dedup stays best effort (kept from the
        // source behavior)
        let event_id = format!("{}_{}", request.order_id, now.timestamp_millis());

        let event = CapiEvent {
            event_name: "Purchase".to_string(),
            event_time: now.timestamp(),
            event_id,
            event_source_url: Some(link.destination_url.clone()),
            action_source: "website".to_string(),
            user_data,
            custom_data: CapiCustomData {
                currency: "KRW".to_string(),
                value: request.order_amount,
                order_id: Some(request.order_id.clone()),
                content_ids: request.product_id.clone().map(|p| vec![p]),
                content_name: request.product_name.clone(),
                content_type: request.product_id.as_ref().map(|_| "product".to_string()),
                num_items: request.quantity,
            },
        };

        let capi_request = CapiRequest {
            data: vec![event],
            test_event_code: get_config().meta.test_event_code.clone(),
        };

        let ack = self
            .transport
            .send_event(&pixel_id, &access_token, &capi_request)
            .await?;

        let record = ForwardRecord {
            meta_sent: true,
            meta_sent_at: Some(now),
            fb_trace_id: ack.fbtrace_id.clone(),
            events_received: ack.events_received,
        };
        if let Err(e) = self
            .storage
            .record_forward_result(&conversion_id, record)
            .await
        {
            // the platform already has the event; losing the annotation is
            // not worth failing the caller
            warn!(
                "Failed to annotate conversion {} with forward outcome: {}",
                conversion_id, e
            );
        }

        Ok(ForwardOutcome::Sent {
            events_received: ack.events_received,
            fbtrace_id: ack.fbtrace_id,
        })
    }

    /// Ensure a conversion row exists for the outcome annotation. A caller
    /// supplied id must reference an existing row; otherwise a new row is
    /// inserted and the link's conversion counter moves.
    async fn resolve_conversion_row(
        &self,
        request: &ForwardRequest,
        link: &TrackingLink,
    ) -> Result<String> {
        if let Some(ref id) = request.conversion_id {
            if self.storage.get_conversion(id).await?.is_none() {
                return Err(ServiceError::not_found(format!(
                    "conversion not found: {}",
                    id
                )));
            }
            return Ok(id.clone());
        }

        let conversion = Conversion {
            id: new_conversion_id(),
            tracking_link_id: link.id.clone(),
            order_id: request.order_id.clone(),
            order_amount: request.order_amount,
            product_id: request.product_id.clone(),
            product_name: request.product_name.clone(),
            quantity: request.quantity,
            meta_sent: false,
            meta_sent_at: None,
            fb_trace_id: None,
            events_received: None,
            created_at: Utc::now(),
        };
        let id = conversion.id.clone();
        self.storage.insert_conversion(conversion).await?;

        if let Err(e) = self.storage.increment_link_conversions(&link.id).await {
            warn!(
                "Failed to increment conversion counter for link {}: {}",
                link.id, e
            );
        }

        Ok(id)
    }

    /// Link-level credentials first, then the seller account's defaults.
    async fn resolve_credentials(
        &self,
        link: &TrackingLink,
    ) -> Result<Option<(String, String)>> {
        if let (Some(pixel_id), Some(access_token)) =
            (link.meta_pixel_id.clone(), link.meta_access_token.clone())
        {
            return Ok(Some((pixel_id, access_token)));
        }

        let seller = self.storage.get_seller(&link.seller_id).await?;
        Ok(seller.and_then(|s| match (s.meta_pixel_id, s.meta_access_token) {
            (Some(pixel_id), Some(access_token)) => Some((pixel_id, access_token)),
            _ => None,
        }))
    }
}
