use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

// Wire format for timestamps: second precision, UTC
fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

// Body returned by the fetch endpoint
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: u64,
    pub reason: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl RequestRecord {
    pub fn new(id: u64, reason: &str) -> Result<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::InvalidState(
                "reason cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            request_id: short_request_id(),
        })
    }
}

// 8 hex chars taken from a v4 uuid
pub fn short_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

// Snapshot of the request counters and store state
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub error_requests: u64,
    pub success_rate: f64,
    pub cache_size: usize,
    pub cache_initialized: bool,
}

impl ServiceStats {
    // What health reports when the real snapshot can't be computed
    pub fn baseline() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            error_requests: 0,
            success_rate: 0.0,
            cache_size: 0,
            cache_initialized: false,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub statistics: ServiceStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_trims_reason_and_gets_short_id() {
        let record = RequestRecord::new(7, "  I'm saving myself for tacos  ").unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.reason, "I'm saving myself for tacos");
        assert_eq!(record.request_id.len(), 8);
        assert!(record.request_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn record_rejects_blank_reason() {
        assert!(matches!(
            RequestRecord::new(1, "   "),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = RequestRecord::new(1, "Test rejection").unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["reason"], "Test rejection");
        assert_eq!(json["requestId"], record.request_id.as_str());
        let ts = json["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), "2024-01-01T00:00:00Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn request_ids_differ() {
        assert_ne!(short_request_id(), short_request_id());
    }

    #[test]
    fn health_status_is_uppercase() {
        assert_eq!(serde_json::to_value(HealthStatus::Up).unwrap(), "UP");
        assert_eq!(serde_json::to_value(HealthStatus::Down).unwrap(), "DOWN");
    }
}
