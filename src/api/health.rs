use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;

use crate::storage::Storage;

#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: String,
    uptime_secs: i64,
}

pub struct HealthService {}

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<dyn Storage>>,
        start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let uptime = chrono::Utc::now() - start_time.start_datetime;
        HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            backend: storage.backend_name().to_string(),
            uptime_secs: uptime.num_seconds(),
        })
    }
}
