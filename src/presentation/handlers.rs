// HTTP request handlers
use crate::application::export::export_file_name;
use crate::domain::monitor::FrequencyVariant;
use crate::infrastructure::chunked_stream::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, csv_download_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Log a failed use case and turn it into a 500
fn internal_error(context: &str, e: anyhow::Error) -> Response {
    tracing::error!("{}: {:#}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all monitors
pub async fn list_monitors(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor_service.list_monitors().await {
        Ok(monitors) => Json(monitors).into_response(),
        Err(e) => {
            tracing::warn!("Error listing monitors: {}", e);
            // An unreachable store shows as an empty list
            Json(Vec::<()>::new()).into_response()
        }
    }
}

/// Per-variant monitor counts
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor_service.dashboard().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => internal_error("Error building dashboard", e),
    }
}

/// Planned vs actual points of the latest record
pub async fn cycle_chart(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.chart_service.cycle_chart(&id).await {
        Ok(Some(chart)) => Json(chart).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error loading chart for {}", id), e),
    }
}

/// Retained records of a monitor
pub async fn list_records(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.chart_service.records(&id).await {
        Ok(Some(records)) => Json(records).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error listing records for {}", id), e),
    }
}

/// Planned vs actual points of one retained record
pub async fn record_chart(
    Path((id, record_number)): Path<(String, u32)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.chart_service.record_chart(&id, record_number).await {
        Ok(Some(chart)) => Json(chart).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(
            &format!("Error loading record {} of {}", record_number, id),
            e,
        ),
    }
}

/// All retained readings of the first monitor running a variant
pub async fn variant_chart(
    Path(variant): Path<FrequencyVariant>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.chart_service.variant_chart(variant).await {
        Ok(Some(chart)) => Json(chart).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error loading {} chart", variant.label()), e),
    }
}

/// CSV download of the latest record
pub async fn export_csv(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let csv = match state.chart_service.export_csv(&id).await {
        Ok(Some(csv)) => csv,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error(&format!("Error exporting {}", id), e),
    };

    let file_name = export_file_name("cycle_data", "csv", chrono::Utc::now());
    match csv_download_response(csv, &file_name, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Toggle live mode
pub async fn toggle_live(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.monitor_service.toggle_live(&id).await {
        Ok(Some(is_live)) => Json(serde_json::json!({ "id": id, "is_live": is_live })).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error toggling live mode for {}", id), e),
    }
}

/// Generate the next simulated record now
pub async fn generate_next(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.monitor_service.generate_next(&id).await {
        Ok(Some(outcome)) => Json(outcome).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error generating for {}", id), e),
    }
}

/// Connect or disconnect the simulated PLC
pub async fn toggle_connection(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.monitor_service.toggle_connection(&id).await {
        Ok(Some(outcome)) => Json(outcome).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error toggling PLC link for {}", id), e),
    }
}

/// Wipe the open live charts of a monitor
pub async fn clear_live(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.live_service.clear(&id).await {
        Ok(Some(charts)) => {
            Json(serde_json::json!({ "id": id, "cleared_charts": charts })).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error clearing live chart for {}", id), e),
    }
}

/// Stream live chart frames while the monitor is live
pub async fn live_stream(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.live_service.open(&id).await {
        Ok(Some(rx)) => stream_from_receiver(rx).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&format!("Error opening live chart for {}", id), e),
    }
}
