/// Thumbnail Service - HTTP Server
///
/// Webhook for S3 upload notifications, gallery listing, upload URLs and the
/// live completion stream.
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use thumbnail_service::handlers;
use thumbnail_service::metrics;
use thumbnail_service::middleware;
use thumbnail_service::services::subscription::NotificationBroker;
use thumbnail_service::services::thumbnail::storage::load_aws_config;
use thumbnail_service::services::{
    JobDispatcher, ObjectStore, S3ObjectStore, SnsBroker, ThumbnailPipeline,
};
use thumbnail_service::{Config, ConnectionManager};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting thumbnail service");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e).context("failed to load configuration");
        }
    };

    let sdk_config = load_aws_config(&config).await;
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::from_sdk_config(&sdk_config));
    let broker: Arc<dyn NotificationBroker> = Arc::new(SnsBroker::from_sdk_config(&sdk_config));

    let connections = ConnectionManager::new(config.listener_buffer);
    let pipeline = Arc::new(ThumbnailPipeline::new(
        store.clone(),
        connections.clone(),
        config.clone(),
    ));
    let dispatcher = JobDispatcher::new(pipeline, broker, config.max_concurrent_jobs);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat = connections.spawn_heartbeat(
        Duration::from_secs(config.heartbeat_interval_secs),
        shutdown_rx,
    );

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!(
        address = %bind_address,
        source = %config.source_bucket,
        destination = %config.destination_bucket,
        "HTTP server listening"
    );

    let app_config = config.clone();
    let app_connections = connections.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(app_connections.clone()))
            .wrap(actix_middleware::Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::cors())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::register_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("Thumbnail service shutting down");

    let _ = shutdown_tx.send(true);
    if let Err(e) = heartbeat.await {
        tracing::warn!(error = %e, "Heartbeat task ended abnormally");
    }
    connections.clear_all().await;

    Ok(())
}
