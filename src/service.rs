use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Result, ServiceError};
use crate::metrics::{RequestCounter, round2};
use crate::models::{RequestRecord, ServiceStats};
use crate::store::MessageStore;

// Aggregate metrics are logged every this many requests
const METRICS_LOG_EVERY: u64 = 100;

pub struct RejectionService {
    store: Arc<MessageStore>,
    counter: Arc<RequestCounter>,
}

impl RejectionService {
    pub fn new(store: Arc<MessageStore>, counter: Arc<RequestCounter>) -> Self {
        Self { store, counter }
    }

    pub fn handle_fetch(&self, client: &str) -> Result<RequestRecord> {
        let id = self.counter.begin();
        info!(request = id, client = %client, "Processing rejection request");

        match self.build_record(id) {
            Ok(record) => {
                self.counter.record_success();
                info!(
                    request = id,
                    request_id = %record.request_id,
                    reason_len = record.reason.len(),
                    "Successfully generated rejection response"
                );

                if id % METRICS_LOG_EVERY == 0 {
                    if let Err(e) = self.log_service_metrics() {
                        warn!(error = %e, "Failed to log service metrics");
                    }
                }
                Ok(record)
            }
            Err(e) => {
                self.counter.record_error();
                error!(request = id, client = %client, error = %e, "Failed to process rejection request");
                Err(e)
            }
        }
    }

    fn build_record(&self, id: u64) -> Result<RequestRecord> {
        if !self.store.is_ready() {
            return Err(ServiceError::NotReady);
        }

        let reason = self.store.pick(&mut rand::rng())?;
        if reason.trim().is_empty() {
            return Err(ServiceError::InvalidState(
                "invalid rejection reason retrieved from cache".to_string(),
            ));
        }

        RequestRecord::new(id, reason)
    }

    // Baseline stats when the counters can't be read consistently
    pub fn health_snapshot(&self) -> ServiceStats {
        self.try_snapshot().unwrap_or_else(|e| {
            error!(error = %e, "Failed to get service statistics");
            ServiceStats::baseline()
        })
    }

    fn try_snapshot(&self) -> Result<ServiceStats> {
        let snap = self.counter.snapshot();

        let outcomes = snap
            .success
            .checked_add(snap.errors)
            .ok_or_else(|| ServiceError::InternalFailure("request counters overflowed".to_string()))?;
        if outcomes > snap.total {
            return Err(ServiceError::InternalFailure(format!(
                "{} outcomes recorded for {} requests",
                outcomes, snap.total
            )));
        }

        Ok(ServiceStats {
            total_requests: snap.total,
            successful_requests: snap.success,
            error_requests: snap.errors,
            success_rate: round2(snap.success_rate()),
            cache_size: self.store.size(),
            cache_initialized: self.store.is_ready(),
        })
    }

    fn log_service_metrics(&self) -> Result<()> {
        let stats = self.try_snapshot()?;
        info!(
            total = stats.total_requests,
            success = stats.successful_requests,
            errors = stats.error_requests,
            success_rate = %format!("{:.2}", stats.success_rate),
            cache_size = stats.cache_size,
            "Service metrics"
        );
        Ok(())
    }
}

pub fn assess(stats: &ServiceStats) -> std::result::Result<(), String> {
    if !stats.cache_initialized {
        return Err(ServiceError::NotReady.to_string());
    }
    if stats.cache_size == 0 {
        return Err("rejection cache is empty".to_string());
    }
    if stats.total_requests > 10 && stats.success_rate < 50.0 {
        return Err(format!("success rate too low: {:.2}%", stats.success_rate));
    }
    Ok(())
}
