// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_service::ChartService;
use crate::application::live_service::LiveChartService;
use crate::application::monitor_service::MonitorService;
use crate::infrastructure::config::load_config;
use crate::infrastructure::memory_repository::InMemoryRepository;
use crate::infrastructure::simulator::SignalSimulator;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_live, cycle_chart, dashboard, export_csv, generate_next, health_check, list_monitors,
    list_records, live_stream, record_chart, toggle_connection, toggle_live, variant_chart,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config().context("Failed to load configuration")?;

    // Repository (infrastructure layer)
    let repository = Arc::new(InMemoryRepository::new(
        SignalSimulator::new(config.simulator.noise_ratio),
        config.simulator.generation_interval(),
        config.simulator.retained_records,
    ));
    for monitor in config.monitors_or_default() {
        repository
            .add_monitor(&monitor.id, monitor.variant, monitor.plc_link())
            .await;
    }

    // Services (application layer)
    let monitor_service = MonitorService::new(repository.clone());
    let chart_service = ChartService::new(repository.clone());
    let live_service = LiveChartService::new(repository.clone(), config.live.to_settings());

    tokio::spawn(
        monitor_service
            .clone()
            .run_live_generation(config.simulator.generation_interval()),
    );

    let state = Arc::new(AppState {
        monitor_service,
        chart_service,
        live_service,
    });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/:variant/chart", get(variant_chart))
        .route("/monitors", get(list_monitors))
        .route("/monitors/:id/chart", get(cycle_chart))
        .route("/monitors/:id/records", get(list_records))
        .route("/monitors/:id/records/:n/chart", get(record_chart))
        .route("/monitors/:id/export.csv", get(export_csv))
        .route("/monitors/:id/live", post(toggle_live))
        .route("/monitors/:id/live/clear", post(clear_live))
        .route("/monitors/:id/live/stream", get(live_stream))
        .route("/monitors/:id/generate", post(generate_next))
        .route("/monitors/:id/connection", post(toggle_connection))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server.addr))?;
    tracing::info!("Starting vibration-chart service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
