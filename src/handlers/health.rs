use std::sync::Arc;
use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.config.service_name.clone(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let (status, message) = match app_state.hub.coordinator().store().list_all().await {
        Ok(_) => ("ok", "Service is ready".to_string()),
        Err(e) => ("degraded", format!("Note store unavailable: {}", e)),
    };
    Json(HealthResponse {
        status: status.to_string(),
        service: app_state.config.service_name.clone(),
        message,
    })
}
