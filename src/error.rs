use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

use crate::models::ErrorBody;

pub type Result<T> = std::result::Result<T, ServiceError>;

// Every failure a request or startup can hit
#[derive(Debug, Error)]
pub enum ServiceError {
    // Store was never initialized (startup ordering bug)
    #[error("Rejection service not ready - cache not initialized")]
    NotReady,

    // Picked a blank message, store is corrupted
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Too many requests. Try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Invalid request format: {0}")]
    MalformedRequest(String),

    #[error("Suspicious activity detected: {0}")]
    SuspiciousRequest(String),

    #[error("Internal failure: {0}")]
    InternalFailure(String),

    // Only fatal at startup
    #[error("Cache initialization failed: {0}")]
    StoreInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::SuspiciousRequest(_) => StatusCode::FORBIDDEN,
            Self::InvalidState(_)
            | Self::InternalFailure(_)
            | Self::StoreInit(_)
            | Self::Config(_)
            | Self::Metrics(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Short label used for the `error` field of the JSON body
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotReady => "Service Unavailable",
            Self::RateLimited { .. } => "Rate limit exceeded",
            Self::MalformedRequest(_) => "Bad Request",
            Self::SuspiciousRequest(_) => "Forbidden",
            _ => "Internal Server Error",
        }
    }

    // Client-facing message; internal details stay in the logs
    fn public_message(&self) -> String {
        match self {
            Self::MalformedRequest(_) => "Invalid request format".to_string(),
            Self::SuspiciousRequest(_) => "Suspicious activity detected".to_string(),
            Self::NotReady | Self::RateLimited { .. } => self.to_string(),
            _ => "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.label().to_string(),
            message: self.public_message(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let Self::RateLimited { retry_after } = &self {
            // Round up so clients never retry a moment too early
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
