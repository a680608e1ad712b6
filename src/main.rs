// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    Router,
    routing::{delete, get, put},
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use meter_dashboard::application::dashboard_service::DashboardService;
use meter_dashboard::application::transform_service::TransformService;
use meter_dashboard::infrastructure::backend_repository::HttpMeterRepository;
use meter_dashboard::infrastructure::config::load_app_config;
use meter_dashboard::presentation::app_state::AppState;
use meter_dashboard::presentation::handlers::{
    delete_readings, get_calculations, get_dashboard, get_readings, get_transform, health_check,
    update_transform,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpMeterRepository::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.timeout_secs),
    )?);

    // Create services (application layer)
    let transform_service = TransformService::new(repository.clone());
    let dashboard_service = DashboardService::new(repository.clone(), transform_service.clone());

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        transform_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/readings/:utility", get(get_readings))
        .route("/readings/by-date/:date", delete(delete_readings))
        .route("/calculations/:utility", get(get_calculations))
        .route("/transform", get(get_transform))
        .route("/transform/:field", put(update_transform))
        .layer(CompressionLayer::new().br(true).gzip(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen_addr))?;
    tracing::info!("Starting meter-dashboard on {} (backend {})", addr, config.backend.base_url);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
