use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

// Cross-origin access is only offered under this prefix
const CORS_PREFIX: &str = "/api/";
const CORS_MAX_AGE_SECS: &str = "3600";
const HSTS: &str = "max-age=31536000; includeSubDomains";

// Any origin, GET only, any request header, no credentials
pub async fn cors(req: Request, next: Next) -> Response {
    if !req.uri().path().starts_with(CORS_PREFIX) || !req.headers().contains_key(header::ORIGIN) {
        return next.run(req).await;
    }

    if req.method() == Method::OPTIONS {
        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_METHOD) {
            return preflight(requested, req.headers());
        }
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

// Answered here so preflights never reach the guard or spend tokens
fn preflight(requested: &HeaderValue, headers: &HeaderMap) -> Response {
    if requested.as_bytes() != Method::GET.as_str().as_bytes() {
        debug!(method = ?requested, "Rejected CORS preflight");
        return (StatusCode::FORBIDDEN, "Invalid CORS request").into_response();
    }

    let mut response = StatusCode::OK.into_response();
    let out = response.headers_mut();
    out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    out.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET"));
    out.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(CORS_MAX_AGE_SECS));
    // Every header is allowed, so echo whatever was asked for
    if let Some(asked) = headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, asked.clone());
    }
    response
}

pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    response
}
