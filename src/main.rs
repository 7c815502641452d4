//! NDI Controller
//!
//! Main entry point: wires the services, serves the API and frontend,
//! and stops all worker processes on shutdown.

use ndi_controller::{
    auth_service::AuthService,
    config_generator::ConfigGenerator,
    discovery::{DiscoveryConfig, DiscoveryService},
    extra_ips::ExtraIpStore,
    preview::PreviewStore,
    process_supervisor::ProcessSupervisor,
    ptz_forwarder::PtzForwarder,
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ndi_controller=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NDI controller v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        worker_bin = %config.worker_bin.display(),
        config_dir = %config.config_dir.display(),
        template_dir = %config.template_dir.display(),
        preview_dir = %config.preview_dir.display(),
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.config_dir).await?;

    // Initialize components
    let extra_ips = Arc::new(ExtraIpStore::new(config.extra_ips_file.clone()));

    let supervisor = Arc::new(ProcessSupervisor::new(
        config.supervisor_config(),
        extra_ips.clone(),
    ));
    tracing::info!("ProcessSupervisor initialized");

    let config_gen = Arc::new(ConfigGenerator::new(
        &config.template_dir,
        config.config_dir.clone(),
        config.preview_dir.clone(),
    )?);
    tracing::info!("ConfigGenerator initialized");

    let discovery = Arc::new(DiscoveryService::new(
        DiscoveryConfig::new(
            config.worker_bin.clone(),
            config.discover_bin.clone(),
            config.worker_env(),
        ),
        extra_ips.clone(),
    ));
    tracing::info!("DiscoveryService initialized");

    let ptz = Arc::new(PtzForwarder::new(config.control_url.clone()));
    let auth = Arc::new(AuthService::new(config.credentials_file.clone()).await?);
    let preview = Arc::new(PreviewStore::new(config.preview_dir.clone()));
    tracing::info!("PtzForwarder, AuthService and PreviewStore initialized");

    // Create application state
    let state = AppState {
        config,
        supervisor: supervisor.clone(),
        config_gen,
        discovery,
        extra_ips,
        ptz,
        auth,
        preview,
    };

    // Create router with static file serving
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop all worker processes before exiting
    tracing::info!("Shutting down, stopping all worker processes");
    supervisor.stop_all().await;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
