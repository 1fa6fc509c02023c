use axum::extract::State;
use std::sync::Arc;

use crate::error::Result;
use crate::state::AppState;

// Prometheus text output
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<String> {
    state
        .metrics
        .tracked_clients
        .set(state.rate_limiter.tracked() as i64);
    state.metrics.render()
}
