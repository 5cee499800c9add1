//! Graph API transport.
//!
//! The transport is a trait so the forwarder can be exercised with a test
//! double; the production implementation posts to
//! `{base}/{version}/{pixel_id}/events`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::capi::types::{CapiAck, CapiRequest, CapiResponse};
use crate::config::get_config;
use crate::errors::{Result, ServiceError};

#[async_trait]
pub trait ConversionTransport: Send + Sync {
    async fn send_event(
        &self,
        pixel_id: &str,
        access_token: &str,
        request: &CapiRequest,
    ) -> Result<CapiAck>;
}

pub struct GraphApiTransport {
    http: reqwest::Client,
}

impl GraphApiTransport {
    pub fn new() -> Self {
        let config = get_config();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.meta.timeout_secs))
            .build()
            .expect("Failed to build Graph API HTTP client");
        Self { http }
    }
}

impl Default for GraphApiTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionTransport for GraphApiTransport {
    async fn send_event(
        &self,
        pixel_id: &str,
        access_token: &str,
        request: &CapiRequest,
    ) -> Result<CapiAck> {
        let config = get_config();
        let url = format!(
            "{}/{}/{}/events",
            config.meta.graph_api_base, config.meta.graph_api_version, pixel_id
        );

        let response = self
            .http
            .post(&url)
            .query(&[("access_token", access_token)])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::conversion_forward(format!("Graph API request failed: {}", e))
            })?;

        let status = response.status();
        let body: CapiResponse = response.json().await.map_err(|e| {
            ServiceError::conversion_forward(format!("Graph API response unreadable: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(ServiceError::conversion_forward(format!(
                "Graph API error (HTTP {}, code {:?}): {}",
                status.as_u16(),
                error.code,
                error.message
            )));
        }
        if !status.is_success() {
            return Err(ServiceError::conversion_forward(format!(
                "Graph API returned HTTP {}",
                status.as_u16()
            )));
        }

        debug!(
            "Graph API accepted events (received: {:?}, trace: {:?})",
            body.events_received, body.fbtrace_id
        );

        Ok(CapiAck {
            events_received: body.events_received,
            fbtrace_id: body.fbtrace_id,
        })
    }
}
