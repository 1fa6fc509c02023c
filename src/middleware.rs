use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{classify, extract_client_key};
use crate::error::ServiceError;
use crate::rate_limit::Decision;
use crate::state::AppState;

// Resolved client identity, handed to the handler
#[derive(Clone, Debug)]
pub struct ClientKey(pub String);

// Classify first, then spend a token from the client's bucket
pub async fn guard(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let client = extract_client_key(req.headers(), remote.as_deref());

    if let Err(e) = classify(req.method(), req.headers(), state.max_content_length) {
        let reason = match &e {
            ServiceError::MalformedRequest(_) => "malformed",
            _ => "suspicious",
        };
        warn!(client = %client, error = %e, "Request blocked");
        state.metrics.rejected.with_label_values(&[reason]).inc();
        return e.into_response();
    }

    match state.rate_limiter.admit(&client) {
        Decision::Allowed => {
            debug!(client = %client, "Request allowed");
            req.extensions_mut().insert(ClientKey(client));
            next.run(req).await
        }
        Decision::Denied { retry_after } => {
            warn!(client = %client, retry_after_ms = retry_after.as_millis() as u64, "Rate limit exceeded");
            state.metrics.rejected.with_label_values(&["rate_limited"]).inc();
            ServiceError::RateLimited { retry_after }.into_response()
        }
    }
}
