use std::sync::Arc;

use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;
use crate::service::RejectionService;

// app's shared state
pub struct AppState {
    pub service: RejectionService,
    pub rate_limiter: Arc<RateLimiter>, // shared with the sweeper
    pub metrics: Arc<Metrics>,          // shared with the sweeper
    pub max_content_length: u64,        // largest accepted Content-Length
}
