//! Bullscan Worker
//!
//! Runs the daily screening jobs on their cron schedules and serves health, metrics and
//! job status over HTTP.

use bullscan::config::ScreenerConfig;
use bullscan::core::bootstrap::build_context;
use bullscan::core::http::{start_server, AppState};
use bullscan::core::runtime::ScreenerRuntime;
use bullscan::logging;
use bullscan::metrics::Metrics;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = ScreenerConfig::from_env()?;
    info!("Starting Bullscan Worker");
    info!(
        environment = %config.environment,
        jobs = ?config.jobs,
        max_attempts = config.retry.max_attempts(),
        cooldown_secs = config.retry.cooldown().as_secs(),
        "Configuration loaded"
    );

    let metrics = Arc::new(Metrics::new()?);
    let ctx = Arc::new(build_context(&config, metrics.clone())?);
    let runtime = Arc::new(ScreenerRuntime::from_config(&config, ctx)?);

    // Status server comes up first so a long startup run stays observable
    let state = AppState::new(metrics, runtime.clone());
    let port = config.http_port;
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    if config.run_on_startup {
        info!("Running jobs once at startup...");
        let outcomes = runtime.run_startup().await;
        for (job, outcome) in outcomes {
            info!(job = %job, outcome = ?outcome, "Startup run of {} finished", job);
        }
    }

    info!("Starting job schedulers...");
    runtime.start().await;

    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down worker...");
    runtime.stop().await;
    server.abort();
    info!("Worker stopped");

    Ok(())
}
