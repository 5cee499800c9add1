//! Conversion matcher / forwarder tests.
//!
//! The transport is a recording double, so every assertion about what would
//! reach the Graph API inspects the captured request.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use sellerport_tracking::api::api_routes;
use sellerport_tracking::attribution::{ClickCounterManager, ClickRecorder, ClickSink, ClickSource};
use sellerport_tracking::capi::types::{CapiAck, CapiRequest, hash_email};
use sellerport_tracking::capi::{ConversionForwarder, ConversionTransport};
use sellerport_tracking::config::init_config;
use sellerport_tracking::errors::{Result as ServiceResult, ServiceError};
use sellerport_tracking::storage::{
    ClickEvent, LinkStatus, MemoryStorage, SellerAccount, Storage, TrackingLink,
};

struct MockTransport {
    calls: Mutex<Vec<(String, String, CapiRequest)>>,
    fail: AtomicBool,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> (String, String, CapiRequest) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ConversionTransport for MockTransport {
    async fn send_event(
        &self,
        pixel_id: &str,
        access_token: &str,
        request: &CapiRequest,
    ) -> ServiceResult<CapiAck> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::conversion_forward(
                "Graph API error (HTTP 400, code Some(190)): Invalid OAuth access token.",
            ));
        }
        self.calls.lock().unwrap().push((
            pixel_id.to_string(),
            access_token.to_string(),
            request.clone(),
        ));
        Ok(CapiAck {
            events_received: Some(1),
            fbtrace_id: Some("trace123".to_string()),
        })
    }
}

fn make_link(id: &str, pixel: Option<(&str, &str)>) -> TrackingLink {
    TrackingLink {
        id: id.to_string(),
        seller_id: "seller1".to_string(),
        campaign_id: None,
        destination_url: "https://shop.example/p/1".to_string(),
        utm_source: Some("meta".to_string()),
        utm_medium: Some("paid".to_string()),
        utm_campaign: None,
        status: LinkStatus::Active,
        click_count: 0,
        conversion_count: 0,
        last_click_at: None,
        store_slug: None,
        video_code: None,
        meta_pixel_id: pixel.map(|(p, _)| p.to_string()),
        meta_access_token: pixel.map(|(_, t)| t.to_string()),
        created_at: Utc::now(),
    }
}

fn make_click(link_id: &str, click_id: &str, fbp: Option<&str>, age: Duration) -> ClickEvent {
    ClickEvent {
        click_id: click_id.to_string(),
        tracking_link_id: link_id.to_string(),
        seller_id: "seller1".to_string(),
        campaign_id: None,
        ip_address: Some("1.2.3.4".to_string()),
        user_agent: Some("UA-X".to_string()),
        referer: None,
        fbp: fbp.map(String::from),
        fbc: Some("fb.1.123.IwAR".to_string()),
        utm_source: None,
        utm_medium: None,
        utm_campaign: None,
        source: ClickSource::TrackingRedirect,
        is_unique: true,
        is_converted: false,
        converted_at: None,
        created_at: Utc::now() - age,
    }
}

struct TestEnv {
    storage: Arc<MemoryStorage>,
    transport: Arc<MockTransport>,
}

impl TestEnv {
    fn new() -> Self {
        init_config();
        Self {
            storage: Arc::new(MemoryStorage::new()),
            transport: Arc::new(MockTransport::new()),
        }
    }
}

macro_rules! conversion_app {
    ($env:expr) => {{
        let dyn_storage: Arc<dyn Storage> = Arc::clone(&$env.storage) as Arc<dyn Storage>;
        let recorder = Arc::new(ClickRecorder::new(
            Arc::clone(&dyn_storage),
            ClickCounterManager::new(
                Arc::clone(&$env.storage) as Arc<dyn ClickSink>,
                tokio::time::Duration::from_secs(3600),
                usize::MAX,
            ),
        ));
        let forwarder = Arc::new(ConversionForwarder::new(
            Arc::clone(&dyn_storage),
            Arc::clone(&$env.transport) as Arc<dyn ConversionTransport>,
        ));

        test::init_service(
            App::new()
                .app_data(web::Data::new(dyn_storage))
                .app_data(web::Data::new(recorder))
                .app_data(web::Data::new(forwarder))
                .service(api_routes()),
        )
        .await
    }};
}

fn forward_body(link_id: &str) -> serde_json::Value {
    json!({
        "trackingLinkId": link_id,
        "orderId": "ORD-1001",
        "orderAmount": 39000.0,
        "productName": "Vitamin C Serum",
        "productId": "SKU-77",
        "quantity": 2
    })
}

#[tokio::test]
async fn test_no_credentials_skips_without_outbound_calls() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", None))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metaSent"], false);
    assert_eq!(env.transport.call_count(), 0);
}

#[tokio::test]
async fn test_forward_with_link_credentials() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metaSent"], true);
    assert_eq!(body["eventsReceived"], 1);
    assert_eq!(body["fbtraceId"], "trace123");

    let (pixel_id, access_token, request) = env.transport.last_call();
    assert_eq!(pixel_id, "pixel-1");
    assert_eq!(access_token, "token-1");

    let event = &request.data[0];
    assert_eq!(event.event_name, "Purchase");
    assert_eq!(event.action_source, "website");
    assert_eq!(event.custom_data.currency, "KRW");
    assert_eq!(event.custom_data.value, 39000.0);
    assert_eq!(event.custom_data.num_items, Some(2));
    assert_eq!(event.custom_data.order_id.as_deref(), Some("ORD-1001"));
    assert_eq!(
        event.custom_data.content_ids,
        Some(vec!["SKU-77".to_string()])
    );
    assert_eq!(
        event.event_source_url.as_deref(),
        Some("https://shop.example/p/1")
    );
    assert!(event.event_id.starts_with("ORD-1001_"));
}

#[tokio::test]
async fn test_seller_default_credentials_fallback() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", None))
        .await
        .unwrap();
    env.storage
        .insert_seller(SellerAccount {
            id: "seller1".to_string(),
            name: Some("Hana Beauty".to_string()),
            meta_pixel_id: Some("pixel-acct".to_string()),
            meta_access_token: Some("token-acct".to_string()),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let (pixel_id, _, _) = env.transport.last_call();
    assert_eq!(pixel_id, "pixel-acct");
}

#[tokio::test]
async fn test_recovers_signals_from_most_recent_click() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    env.storage
        .insert_click(make_click("l1", "sp_old", Some("fb.1.old"), Duration::hours(2)))
        .await
        .unwrap();
    env.storage
        .insert_click(make_click("l1", "sp_new", Some("fb.1.abc"), Duration::minutes(5)))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    test::call_service(&app, req).await;

    let (_, _, request) = env.transport.last_call();
    let user_data = &request.data[0].user_data;
    // most recent click wins
    assert_eq!(user_data.fbp.as_deref(), Some("fb.1.abc"));
    assert_eq!(user_data.fbc.as_deref(), Some("fb.1.123.IwAR"));
    assert_eq!(user_data.client_ip_address.as_deref(), Some("1.2.3.4"));
    assert_eq!(user_data.client_user_agent.as_deref(), Some("UA-X"));

    // the recovered click is flipped
    let click = env.storage.get_click("sp_new").await.unwrap().unwrap();
    assert!(click.is_converted);
    assert!(click.converted_at.is_some());
    let old = env.storage.get_click("sp_old").await.unwrap().unwrap();
    assert!(!old.is_converted);
}

#[tokio::test]
async fn test_directly_supplied_values_take_precedence() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    env.storage
        .insert_click(make_click("l1", "sp_a", Some("fb.1.stored"), Duration::minutes(5)))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let mut body = forward_body("l1");
    body["fbp"] = json!("fb.1.direct");
    body["email"] = json!("Buyer@Example.com");

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(&body)
        .to_request();
    test::call_service(&app, req).await;

    let (_, _, request) = env.transport.last_call();
    let user_data = &request.data[0].user_data;
    assert_eq!(user_data.fbp.as_deref(), Some("fb.1.direct"));
    assert_eq!(
        user_data.em,
        Some(vec![hash_email("buyer@example.com")])
    );
}

#[tokio::test]
async fn test_forward_without_any_prior_click() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // partial user data is fine, the platform does the matching
    assert_eq!(resp.status(), StatusCode::OK);
    let (_, _, request) = env.transport.last_call();
    let user_data = &request.data[0].user_data;
    assert!(user_data.fbp.is_none());
    assert!(user_data.client_ip_address.is_none());
}

#[tokio::test]
async fn test_conversion_row_annotated_and_counter_moved() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    test::call_service(&app, req).await;

    let link = env.storage.get_link("l1").await.unwrap().unwrap();
    assert_eq!(link.conversion_count, 1);
}

#[tokio::test]
async fn test_unknown_link_is_404() {
    let env = TestEnv::new();
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("ghost"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_transport_failure_is_500_with_error() {
    let env = TestEnv::new();
    env.storage
        .insert_link(make_link("l1", Some(("pixel-1", "token-1"))))
        .await
        .unwrap();
    env.transport.fail.store(true, Ordering::SeqCst);
    let app = conversion_app!(env);

    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(forward_body("l1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("OAuth"));
}

#[tokio::test]
async fn test_negative_amount_is_400() {
    let env = TestEnv::new();
    let app = conversion_app!(env);

    let mut body = forward_body("l1");
    body["orderAmount"] = json!(-5.0);
    let req = TestRequest::post()
        .uri("/api/conversions/forward")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
