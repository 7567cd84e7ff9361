// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_repository::DashboardRepository;
use crate::application::dashboard_service::DashboardService;
use crate::application::native_filters::NativeFilterDebouncer;
use crate::infrastructure::api_repository::ApiRepository;
use crate::infrastructure::config::{Backend, Settings, load_settings};
use crate::infrastructure::memory_repository::MemoryRepository;
use crate::presentation::app_state::AppState;

fn build_repository(settings: &Settings) -> anyhow::Result<Arc<dyn DashboardRepository>> {
    Ok(match settings.backend {
        Backend::Api => Arc::new(ApiRepository::new(&settings.api)?),
        Backend::Memory => match &settings.seed_file {
            Some(path) => Arc::new(MemoryRepository::load_seed(path)?),
            None => Arc::new(MemoryRepository::new()),
        },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = load_settings()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create repository (infrastructure layer)
    let repository = build_repository(&settings)?;
    tracing::info!(backend = ?settings.backend, "dashboard repository ready");

    // Create services (application layer)
    let dashboard_service = DashboardService::new(repository.clone());
    let native_filters =
        NativeFilterDebouncer::spawn(repository, settings.native_filter_debounce());

    let state = Arc::new(AppState {
        dashboard_service,
        native_filters,
    });

    // Build router (presentation layer)
    let router = presentation::router(state.clone()).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = settings.server.bind_addr.parse()?;
    tracing::info!("Starting dashboard-builder service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    // Flush native filters still waiting out their quiet period
    match Arc::try_unwrap(state) {
        Ok(state) => state.native_filters.shutdown().await,
        Err(_) => tracing::warn!("Pending native filter changes were not flushed"),
    }

    Ok(())
}
