//! Sampling loop
//!
//! Runs the [`Sampler`] on a fixed delay until shutdown, forwarding each
//! tick's history copy to a channel and keeping health and self-metrics
//! current.

use super::{ContainerRuntime, Sampler, TickSummary};
use crate::health::{components, HealthRegistry};
use crate::history::HistoryStore;
use crate::models::{ContainerId, HistoryEntry};
use crate::observability::{AgentMetrics, StructuredLogger};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Configuration for the sampling loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Delay between the end of one tick and the start of the next (default: 5 seconds)
    pub interval: Duration,
    /// Channel buffer size for tick reports
    pub buffer_size: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            buffer_size: 16,
        }
    }
}

/// Result of one successful tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Monotonic tick counter, starting at 1
    pub sequence: u64,
    /// Unix timestamp at tick completion
    pub timestamp: i64,
    pub summary: TickSummary,
    pub containers: HashMap<ContainerId, HistoryEntry>,
}

/// Periodically samples all running containers
pub struct SamplingLoop {
    sampler: Sampler,
    config: LoopConfig,
    reports_tx: mpsc::Sender<TickReport>,
    metrics: Option<AgentMetrics>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    sequence: u64,
}

impl SamplingLoop {
    /// `config.buffer_size` must be non-zero; [`SamplingLoopBuilder`] checks it
    pub(crate) fn new(sampler: Sampler, config: LoopConfig) -> (Self, mpsc::Receiver<TickReport>) {
        let (reports_tx, reports_rx) = mpsc::channel(config.buffer_size);

        let loop_instance = Self {
            sampler,
            config,
            reports_tx,
            metrics: None,
            health: None,
            logger: None,
            sequence: 0,
        };

        (loop_instance, reports_rx)
    }

    /// Run until `shutdown` fires
    ///
    /// The first tick happens one interval after start. A tick is never
    /// started while another is in progress.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting sampling loop"
        );

        loop {
            tokio::select! {
                _ = sleep(self.config.interval) => {
                    self.run_tick().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down sampling loop");
                    break;
                }
            }
        }
    }

    /// Run one tick and publish its outcome
    ///
    /// Returns the report that was sent, or `None` when the listing failed.
    pub async fn run_tick(&mut self) -> Option<TickReport> {
        self.sequence += 1;
        let start = Instant::now();

        match self.sampler.tick().await {
            Ok(containers) => {
                let elapsed = start.elapsed();
                let summary = self.sampler.last_summary().cloned().unwrap_or_default();

                if let Some(metrics) = &self.metrics {
                    metrics.record_tick(&summary, containers.len(), elapsed.as_secs_f64());
                }
                if let Some(logger) = &self.logger {
                    logger.log_tick(self.sequence, &summary, &containers);
                }
                if let Some(health) = &self.health {
                    health.set_healthy(components::RUNTIME).await;
                    if summary.failed > 0 {
                        health
                            .set_degraded(
                                components::SAMPLER,
                                format!("{} containers failed to sample", summary.failed),
                            )
                            .await;
                    } else {
                        health.set_healthy(components::SAMPLER).await;
                    }
                    health.set_ready(true).await;
                }

                let report = TickReport {
                    sequence: self.sequence,
                    timestamp: chrono::Utc::now().timestamp(),
                    summary,
                    containers,
                };

                if let Err(e) = self.reports_tx.try_send(report.clone()) {
                    warn!(error = %e, "Failed to forward tick report");
                }

                Some(report)
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_tick_failure(start.elapsed().as_secs_f64());
                }
                match &self.logger {
                    Some(logger) => logger.log_tick_failure(self.sequence, &e.to_string()),
                    None => warn!(sequence = self.sequence, error = %e, "Sampling tick failed"),
                }
                if let Some(health) = &self.health {
                    health
                        .set_unhealthy(components::RUNTIME, e.to_string())
                        .await;
                }
                None
            }
        }
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

/// Builder for creating the sampling loop
pub struct SamplingLoopBuilder {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    history: Option<HistoryStore>,
    metrics: Option<AgentMetrics>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    config: LoopConfig,
}

impl SamplingLoopBuilder {
    pub fn new() -> Self {
        Self {
            runtime: None,
            history: None,
            metrics: None,
            health: None,
            logger: None,
            config: LoopConfig::default(),
        }
    }

    /// Set the container runtime
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Start from an existing history table instead of an empty one
    pub fn history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set the delay between ticks
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn build(self) -> Result<(SamplingLoop, mpsc::Receiver<TickReport>)> {
        let runtime = self
            .runtime
            .ok_or_else(|| anyhow::anyhow!("Container runtime is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Sampling interval must be greater than zero");
        }
        if self.config.buffer_size == 0 {
            anyhow::bail!("Report buffer size must be greater than zero");
        }

        let sampler = Sampler::with_history(runtime, self.history.unwrap_or_default());
        let (mut sampling_loop, rx) = SamplingLoop::new(sampler, self.config);
        sampling_loop.metrics = self.metrics;
        sampling_loop.health = self.health;
        sampling_loop.logger = self.logger;

        Ok((sampling_loop, rx))
    }
}

impl Default for SamplingLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
