//! Cost Optimizer - scheduled cloud cost optimization service
//!
//! Runs the optimization pipeline on an interval against a JSON inventory,
//! persists validated recommendations and exposes health and metrics.

use anyhow::{Context, Result};
use cost_optimizer::{api, config::OptimizerConfig};
use optimizer_lib::{
    health::HealthRegistry,
    observability::StructuredLogger,
    pipeline::{Pipeline, PipelineScheduler},
    source::{JsonFileSink, JsonFileSource},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cost-optimizer");

    let config = OptimizerConfig::load()?;
    info!(
        inventory = %config.inventory_path.display(),
        output = %config.output_path.display(),
        "Optimizer configured"
    );

    let health_registry = HealthRegistry::with_default_components().await;

    let pipeline = Pipeline::builder()
        .source(Arc::new(JsonFileSource::new(&config.inventory_path)))
        .config(config.pipeline.clone())
        .service_name(&config.service_name)
        .build()
        .context("failed to build pipeline")?;
    let metrics = pipeline.metrics().clone();

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVICE_VERSION, config.run_interval_secs);

    let scheduler = Arc::new(PipelineScheduler::new(
        Arc::new(pipeline),
        Arc::new(JsonFileSink::new(&config.output_path)),
        health_registry.clone(),
        config.run_interval(),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(health_registry, metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    if let Err(e) = scheduler_handle.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
