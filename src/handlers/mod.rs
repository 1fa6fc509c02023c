mod fetch;
mod health;
mod metrics;

pub use fetch::fetch_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use std::sync::Arc;

use crate::middleware::guard;
use crate::security::{cors, security_headers};
use crate::state::AppState;

pub const FETCH_PATH: &str = "/api/v1/rejection";
pub const HEALTH_PATH: &str = "/api/v1/health";
pub const METRICS_PATH: &str = "/metrics";

// The guard also wraps the fetch route's method fallback, so a POST there
// gets the guard's 400 rather than a bare 405
pub fn router(state: Arc<AppState>) -> Router {
    let guarded = Router::new()
        .route(FETCH_PATH, get(fetch_handler))
        .layer(from_fn_with_state(Arc::clone(&state), guard));

    // Probes must keep working while a client is being throttled
    let open = Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route(METRICS_PATH, get(metrics_handler));

    // CORS sits outside the guard so preflights skip it
    guarded
        .merge(open)
        .layer(from_fn(cors))
        .layer(from_fn(security_headers))
        .with_state(state)
}
