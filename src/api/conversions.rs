//! Conversion forwarding endpoint.
//!
//! Server-to-server: the order-processing side of the SaaS posts purchase
//! events here. Missing CAPI credentials are a successful no-op
//! (`metaSent: false`); transport failures are a 500 the caller can log.

use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::clicks::ApiErrorResponse;
use crate::capi::{ConversionForwarder, ForwardOutcome, ForwardRequest};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardConversionRequest {
    pub conversion_id: Option<String>,
    pub tracking_link_id: String,
    pub order_id: String,
    pub order_amount: f64,
    pub product_name: Option<String>,
    pub product_id: Option<String>,
    pub quantity: Option<i32>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardConversionResponse {
    pub success: bool,
    pub meta_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_received: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

pub struct ConversionApiService {}

impl ConversionApiService {
    pub async fn forward(
        body: web::Json<ForwardConversionRequest>,
        forwarder: web::Data<Arc<ConversionForwarder>>,
    ) -> impl Responder {
        let body = body.into_inner();

        if body.order_id.trim().is_empty() {
            return HttpResponse::BadRequest().json(ApiErrorResponse::new("orderId is required"));
        }
        if body.order_amount < 0.0 {
            return HttpResponse::BadRequest()
                .json(ApiErrorResponse::new("orderAmount must not be negative"));
        }

        let request = ForwardRequest {
            conversion_id: body.conversion_id,
            tracking_link_id: body.tracking_link_id,
            order_id: body.order_id,
            order_amount: body.order_amount,
            product_id: body.product_id,
            product_name: body.product_name,
            quantity: body.quantity,
            fbp: body.fbp,
            fbc: body.fbc,
            client_ip: body.client_ip,
            user_agent: body.user_agent,
            email: body.email,
            phone: body.phone,
        };

        match forwarder.forward(request).await {
            Ok(ForwardOutcome::Sent {
                events_received,
                fbtrace_id,
            }) => HttpResponse::Ok().json(ForwardConversionResponse {
                success: true,
                meta_sent: true,
                events_received,
                fbtrace_id,
            }),
            Ok(ForwardOutcome::Skipped) => HttpResponse::Ok().json(ForwardConversionResponse {
                success: true,
                meta_sent: false,
                events_received: None,
                fbtrace_id: None,
            }),
            Err(ServiceError::NotFound(msg)) => {
                HttpResponse::NotFound().json(ApiErrorResponse::new(msg))
            }
            Err(ServiceError::Validation(msg)) => {
                HttpResponse::BadRequest().json(ApiErrorResponse::new(msg))
            }
            Err(e) => {
                error!("Conversion forwarding failed: {}", e);
                HttpResponse::InternalServerError().json(ApiErrorResponse::new(e.to_string()))
            }
        }
    }
}
