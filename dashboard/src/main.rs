use clap::Parser;
use farm_dashboard::client::FarmApi;
use farm_dashboard::config::Config;
use farm_dashboard::dashboard::{self, DashboardState};
use farm_dashboard::search::KnowledgeIndex;
use farm_dashboard::{metrics, rest};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    info!("Starting farm dashboard");
    info!("Farm backend: {}", config.api_url);
    info!("Weather location: {}, {}", config.latitude, config.longitude);
    info!("HTTP server: {}", config.http_addr);

    if let Err(e) = metrics::init_metrics() {
        error!("Failed to register metrics: {}", e);
        std::process::exit(1);
    }

    let index = match &config.knowledge_base {
        Some(path) => KnowledgeIndex::from_path(path),
        None => KnowledgeIndex::bundled(),
    };
    let index = match index {
        Ok(index) => Arc::new(index),
        Err(e) => {
            error!("Failed to load knowledge base: {}", e);
            std::process::exit(1);
        }
    };
    info!("Knowledge base: {} entries", index.len());

    let api = match FarmApi::new(&config.api_url, config.request_timeout()) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let (publish, snapshots) = watch::channel(DashboardState::default().snapshot());
    let (pollers, feeds) = dashboard::spawn_pollers(&api, &config);

    let dashboard_handle = tokio::spawn(dashboard::run_dashboard(feeds, publish));

    let app = rest::create_router(snapshots, index);

    let listener = match tokio::net::TcpListener::bind(&config.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        }
    };

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = dashboard_handle => {
            error!("Dashboard task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    pollers.shutdown();
    info!("Shutting down");
}
