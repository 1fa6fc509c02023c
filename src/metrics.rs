use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

// Totals the orchestrator reports through health
#[derive(Debug, Default)]
pub struct RequestCounter {
    total: AtomicU64,
    success: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns the new total, used as the request's sequence id
    pub fn begin(&self) -> u64 {
        self.total.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    // Outcomes before total, so a snapshot never shows more outcomes than requests
    pub fn snapshot(&self) -> CounterSnapshot {
        let success = self.success.load(Ordering::SeqCst);
        let errors = self.errors.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        CounterSnapshot { total, success, errors }
    }
}

impl CounterSnapshot {
    // Percentage, 100 when nothing has been served yet
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.success as f64 / self.total as f64 * 100.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Prometheus metrics, owned by the app state rather than global
pub struct Metrics {
    registry: Registry,
    pub requests: IntCounterVec,
    pub rejected: IntCounterVec,
    pub tracked_clients: IntGauge,
    pub evicted_clients: IntCounter,
    pub latency: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("rejection_requests_total", "Fetch requests by outcome"),
            &["outcome"],
        )?;
        let rejected = IntCounterVec::new(
            Opts::new(
                "rejection_rejected_requests_total",
                "Requests turned away before reaching the handler",
            ),
            &["reason"],
        )?;
        let tracked_clients =
            IntGauge::new("rejection_tracked_clients", "Client keys with a live rate limit bucket")?;
        let evicted_clients = IntCounter::new(
            "rejection_evicted_clients_total",
            "Idle rate limit buckets removed by the sweeper",
        )?;
        let latency = Histogram::with_opts(HistogramOpts::new(
            "rejection_request_latency_seconds",
            "Fetch handler latency in seconds",
        ))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(tracked_clients.clone()))?;
        registry.register(Box::new(evicted_clients.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            rejected,
            tracked_clients,
            evicted_clients,
            latency,
        })
    }

    // Text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
