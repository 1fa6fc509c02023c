use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;

// Background task evicting idle buckets; aborted on drop if never closed
pub struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn open(limiter: Arc<RateLimiter>, metrics: Arc<Metrics>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(sweep_loop(limiter, metrics, period, shutdown_rx));

        info!(period_secs = period.as_secs(), "Rate limit sweeper started");

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    // Signal the task, wait up to `grace`, then abort it
    pub async fn close(mut self, grace: Duration) {
        info!("Stopping rate limit sweeper...");
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match timeout(grace, &mut handle).await {
            Ok(Ok(())) => info!("Rate limit sweeper stopped"),
            Ok(Err(e)) => warn!(error = %e, "Rate limit sweeper ended abnormally"),
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Rate limit sweeper did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn sweep_loop(
    limiter: Arc<RateLimiter>,
    metrics: Arc<Metrics>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    // First sweep one full period after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Also fires if the sender was dropped
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let removed = limiter.sweep();
                metrics.evicted_clients.inc_by(removed as u64);
                metrics.tracked_clients.set(limiter.tracked() as i64);
                debug!(removed, tracked = limiter.tracked(), "Sweep finished");
            }
        }
    }
}
