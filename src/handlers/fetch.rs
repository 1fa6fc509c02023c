use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::client::sanitize_for_logging;
use crate::error::{Result, ServiceError};
use crate::middleware::ClientKey;
use crate::state::AppState;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub async fn fetch_handler(
    State(state): State<Arc<AppState>>,
    Extension(ClientKey(client)): Extension<ClientKey>,
    headers: HeaderMap,
) -> Result<Response> {
    let user_agent = sanitize_for_logging(
        headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()),
    );
    info!(client = %client, user_agent = %user_agent, "Rejection request received");

    let start_time = Instant::now();
    let result = state.service.handle_fetch(&client);
    state.metrics.latency.observe(start_time.elapsed().as_secs_f64());

    let record = match result {
        Ok(record) => {
            state.metrics.requests.with_label_values(&["success"]).inc();
            record
        }
        Err(e) => {
            state.metrics.requests.with_label_values(&["error"]).inc();
            return Err(e);
        }
    };

    let request_id = HeaderValue::from_str(&record.request_id)
        .map_err(|e| ServiceError::InternalFailure(format!("bad request id header: {}", e)))?;

    let mut response = Json(record).into_response();
    let headers = response.headers_mut();
    headers.insert(X_REQUEST_ID, request_id);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    Ok(response)
}
