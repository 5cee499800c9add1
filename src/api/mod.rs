//! HTTP services and route assembly.

pub mod clicks;
pub mod conversions;
pub mod health;
pub mod redirect;

use actix_web::web;

pub use clicks::ClickApiService;
pub use conversions::ConversionApiService;
pub use health::{AppStartTime, HealthService};
pub use redirect::RedirectService;

/// Redirect routes. Registered last so the JSON API scopes win first.
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/t/{link_id}", web::get().to(RedirectService::handle_tracking))
        .route("/t/{link_id}", web::head().to(RedirectService::handle_tracking))
        .route("/go/{link_id}", web::get().to(RedirectService::handle_organic))
        .route("/go/{link_id}", web::head().to(RedirectService::handle_organic))
        .route(
            "/tt/{store_slug}/{video_code}",
            web::get().to(RedirectService::handle_video),
        )
        .route(
            "/tt/{store_slug}/{video_code}",
            web::head().to(RedirectService::handle_video),
        )
}

/// JSON callback + conversion routes (CORS wrapped in main, so interstitial
/// pages on shop domains can call them).
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .route(
            "/clicks/bridge",
            web::post().to(ClickApiService::record_bridge_click),
        )
        .route(
            "/clicks/loading",
            web::post().to(ClickApiService::record_loading_click),
        )
        .route(
            "/conversions/forward",
            web::post().to(ConversionApiService::forward),
        )
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("/health").route("", web::get().to(HealthService::health_check))
}
