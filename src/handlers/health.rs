use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{HealthResponse, HealthStatus};
use crate::service::assess;
use crate::state::AppState;

// Health check with service statistics, never rate limited
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Health check requested");

    let statistics = state.service.health_snapshot();
    let (status, code, error) = match assess(&statistics) {
        Ok(()) => (HealthStatus::Up, StatusCode::OK, None),
        Err(reason) => {
            warn!(reason = %reason, "Health check failed");
            (HealthStatus::Down, StatusCode::SERVICE_UNAVAILABLE, Some(reason))
        }
    };

    let body = HealthResponse {
        status,
        timestamp: chrono::Utc::now(),
        statistics,
        error,
    };
    (code, [(header::CACHE_CONTROL, "no-cache")], Json(body)).into_response()
}
