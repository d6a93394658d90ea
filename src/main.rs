// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_store::DashboardStore;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::http_client::HttpBatteryClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("battery_dashboard=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create data client (infrastructure layer)
    let client = Arc::new(HttpBatteryClient::new(
        &config.api.base_url,
        config.api.timeout(),
    )?);

    // Create store (application layer)
    let store = DashboardStore::new(
        client,
        config.authorized_devices()?,
        config.api.page_limit,
        config.devices.default_bucket_width,
    )?;
    let state = Arc::new(AppState { store });

    // Initial load: summary for the sidebar, cycles for the default battery
    let initial = state.clone();
    tokio::spawn(async move {
        let default_device = initial.store.snapshot().selection.imei;
        tokio::join!(initial.store.refresh_summary(), async {
            if let Err(e) = initial.store.select_device(default_device).await {
                tracing::error!("Initial battery selection failed: {}", e);
            }
        });
    });

    // Start server
    let addr = config.bind_addr()?;
    tracing::info!("Starting battery dashboard on {} (API {})", addr, config.api.base_url);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;

    Ok(())
}
