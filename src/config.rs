use clap::Parser;
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::rate_limit::RateLimitConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "rejection-service")]
#[command(about = "Rejection as a Service: random rejection reasons over HTTP")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "REJECTION_PORT", default_value_t = 8080)]
    pub port: u16,

    // Tokens per client bucket (max burst)
    #[arg(long, env = "REJECTION_RATE_LIMIT", default_value_t = 100)]
    pub rate_limit: u32,

    // Seconds to refill a whole bucket
    #[arg(long, env = "REJECTION_RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Seconds a bucket may sit unused before it is swept
    #[arg(long, env = "REJECTION_IDLE_TIMEOUT", default_value_t = 3600)]
    pub idle_timeout: u64,

    // Seconds between sweeps
    #[arg(long, env = "REJECTION_SWEEP_INTERVAL", default_value_t = 600)]
    pub sweep_interval: u64,

    // Tracked clients before new ones are refused
    #[arg(long, env = "REJECTION_MAX_CLIENTS", default_value_t = 100_000)]
    pub max_clients: usize,

    // Largest Content-Length accepted on the fetch endpoint
    #[arg(long, env = "REJECTION_MAX_CONTENT_LENGTH", default_value_t = 1024)]
    pub max_content_length: u64,

    // Log filter used when RUST_LOG is unset
    #[arg(long, env = "REJECTION_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit == 0 {
            return Err(ServiceError::Config("rate-limit must be at least 1".to_string()));
        }
        if self.rate_window == 0 {
            return Err(ServiceError::Config("rate-window must be at least 1 second".to_string()));
        }
        if self.sweep_interval == 0 {
            return Err(ServiceError::Config("sweep-interval must be at least 1 second".to_string()));
        }
        if self.max_clients == 0 {
            return Err(ServiceError::Config("max-clients must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            capacity: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
            idle_timeout: Duration::from_secs(self.idle_timeout),
            max_clients: self.max_clients,
        }
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}
