use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use tokio::time::Duration;
use tracing::info;

use sellerport_tracking::api::{self, AppStartTime};
use sellerport_tracking::attribution::{ClickCounterManager, ClickRecorder};
use sellerport_tracking::cache::LinkCache;
use sellerport_tracking::capi::{ConversionForwarder, ConversionTransport, GraphApiTransport};
use sellerport_tracking::config::{get_config, init_config};
use sellerport_tracking::logging::init_logging;
use sellerport_tracking::storage::StorageFactory;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    init_config();
    let config = get_config();

    // keep the guard alive so buffered log lines flush on exit
    let _log_guard = init_logging(config);

    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let (storage, click_sink) = StorageFactory::create()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    info!("Using storage backend: {}", storage.backend_name());

    let counters = ClickCounterManager::new(
        click_sink,
        Duration::from_secs(config.tracking.flush_interval_secs),
        config.tracking.flush_threshold,
    );
    let flush_loop = counters.clone();
    tokio::spawn(async move {
        flush_loop.start_background_task().await;
    });

    let recorder = Arc::new(ClickRecorder::new(Arc::clone(&storage), counters.clone()));
    let transport: Arc<dyn ConversionTransport> = Arc::new(GraphApiTransport::new());
    let forwarder = Arc::new(ConversionForwarder::new(Arc::clone(&storage), transport));
    let link_cache = LinkCache::new();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(Arc::clone(&storage)))
            .app_data(web::Data::new(link_cache.clone()))
            .app_data(web::Data::new(Arc::clone(&recorder)))
            .app_data(web::Data::new(Arc::clone(&forwarder)))
            .app_data(web::Data::new(app_start_time.clone()))
            .service(api::api_routes().wrap(cors))
            .service(api::health_routes())
            .service(api::redirect_routes())
    })
    .workers(config.server.workers)
    .bind(bind_address)?
    .run()
    .await?;

    info!("Server stopped, flushing pending click counters");
    counters.flush().await;

    Ok(())
}
