mod client;
mod clock;
mod config;
mod error;
mod handlers;
mod metrics;
mod middleware;
mod models;
mod rate_limit;
mod security;
mod service;
mod state;
mod store;
mod worker;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::error::Result;
use crate::handlers::{FETCH_PATH, HEALTH_PATH, METRICS_PATH};
use crate::metrics::{Metrics, RequestCounter};
use crate::rate_limit::RateLimiter;
use crate::service::RejectionService;
use crate::state::AppState;
use crate::store::MessageStore;
use crate::worker::Sweeper;

// How long shutdown waits for the sweeper before aborting it
const SWEEPER_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    if let Err(e) = run(args).await {
        error!(error = %e, "Failed to start Rejection as a Service");
        std::process::exit(1);
    }
}

// RUST_LOG wins over --log-level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: Args) -> Result<()> {
    args.validate()?;
    info!("Starting Rejection as a Service application...");

    let metrics = Arc::new(Metrics::new()?);
    let rate_limiter = Arc::new(RateLimiter::new(args.rate_limit_config()));
    let sweeper = Sweeper::open(
        Arc::clone(&rate_limiter),
        Arc::clone(&metrics),
        args.sweep_period(),
    );

    // A failure here ends startup; dropping the sweeper aborts its task
    let store = Arc::new(MessageStore::new());
    store.initialize()?;

    let state = Arc::new(AppState {
        service: RejectionService::new(store, Arc::new(RequestCounter::new())),
        rate_limiter,
        metrics,
        max_content_length: args.max_content_length,
    });
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Rejection as a Service started on {}", addr);
    info!("API available at: http://localhost:{}{}", args.port, FETCH_PATH);
    info!("Health check at: http://localhost:{}{}", args.port, HEALTH_PATH);
    info!("Metrics at: http://localhost:{}{}", args.port, METRICS_PATH);
    info!(
        "Rate limit: {} requests per {} seconds, idle buckets swept every {} seconds",
        args.rate_limit, args.rate_window, args.sweep_interval
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    info!("Shutting down Rejection as a Service application...");
    sweeper.close(SWEEPER_GRACE).await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
