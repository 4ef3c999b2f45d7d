//! Stats Agent - per-host container CPU and memory sampler
//!
//! Samples every running container on a fixed interval and logs the
//! derived CPU and memory percentages as structured JSON.

use anyhow::Result;
use stats_agent_lib::{
    collector::{create_runtime, SamplingLoopBuilder},
    health::{components, HealthRegistry},
    observability::{AgentMetrics, StructuredLogger},
};
use stats_agent::{api, config};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, level from RUST_LOG
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::AgentConfig::load()?;
    info!(node_name = %config.node_name, "Agent configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SAMPLER).await;
    health_registry.register(components::RUNTIME).await;

    let metrics = AgentMetrics::new();

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(AGENT_VERSION, config.poll_interval_secs);

    let runtime = create_runtime(config.docker_host.as_deref())?;

    let (sampling_loop, mut reports) = SamplingLoopBuilder::new()
        .runtime(runtime)
        .interval(config.poll_interval())
        .metrics(metrics)
        .health(health_registry.clone())
        .logger(logger.clone())
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(sampling_loop.run(shutdown_rx));

    // Reports are already logged by the loop; drain so the channel never fills
    let drain_handle = tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            tracing::debug!(
                sequence = report.sequence,
                containers = report.containers.len(),
                "Tick report received"
            );
        }
    });

    let app_state = Arc::new(api::AppState::new(health_registry));
    let listener = api::bind(config.api_port).await?;
    let mut api_handle = tokio::spawn(api::serve_on(listener, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = &mut api_handle => {
            match served {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server stopped"),
                Err(e) => error!(error = %e, "API server task failed"),
            }
            logger.log_shutdown("API server stopped");
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        warn!(error = %e, "Sampling loop task failed");
    }
    drain_handle.abort();
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
