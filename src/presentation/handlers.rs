// HTTP request handlers
use crate::application::events::MonitorStatus;
use crate::domain::monitor::MonitorConfig;
use crate::domain::table::TableView;
use crate::presentation::app_state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor_service.status())
}

pub async fn get_table(State(state): State<Arc<AppState>>) -> Json<TableView> {
    Json(state.monitor_service.table())
}

pub async fn start(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor_service.start())
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor_service.stop())
}

pub async fn acknowledge(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor_service.acknowledge())
}

pub async fn grant_audio(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor_service.grant_audio())
}

/// Replace threshold, monitored units and display filter
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<MonitorConfig>,
) -> Result<Json<MonitorStatus>, (StatusCode, Json<ErrorBody>)> {
    state
        .monitor_service
        .update_config(config)
        .map(Json)
        .map_err(|e| {
            tracing::warn!("Rejected monitor configuration: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
        })
}
