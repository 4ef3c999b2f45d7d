//! Observability infrastructure for the stats agent
//!
//! Provides:
//! - Prometheus self-metrics (tick latency, containers monitored, skip and failure counts)
//! - Structured JSON logging of sampling results with tracing

use crate::collector::TickSummary;
use crate::models::{ContainerId, HistoryEntry};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter,
    IntGauge,
};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for tick latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    tick_latency_seconds: Histogram,
    containers_monitored: IntGauge,
    ticks_completed: IntCounter,
    ticks_failed: IntCounter,
    containers_skipped: IntCounter,
    containers_failed: IntCounter,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "stats_agent_tick_latency_seconds",
                "Time spent on one sampling tick across all containers",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            containers_monitored: register_int_gauge!(
                "stats_agent_containers_monitored",
                "Number of containers with sampling history"
            )
            .expect("Failed to register containers_monitored"),

            ticks_completed: register_int_counter!(
                "stats_agent_ticks_completed_total",
                "Sampling ticks that listed containers successfully"
            )
            .expect("Failed to register ticks_completed"),

            ticks_failed: register_int_counter!(
                "stats_agent_ticks_failed_total",
                "Sampling ticks aborted because the runtime could not be listed"
            )
            .expect("Failed to register ticks_failed"),

            containers_skipped: register_int_counter!(
                "stats_agent_containers_skipped_total",
                "Container samples skipped because the container vanished or returned a bad payload"
            )
            .expect("Failed to register containers_skipped"),

            containers_failed: register_int_counter!(
                "stats_agent_containers_failed_total",
                "Container samples lost to unexpected runtime errors"
            )
            .expect("Failed to register containers_failed"),
        }
    }
}

/// Agent self-metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (registers global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record the outcome of a completed tick
    pub fn record_tick(&self, summary: &TickSummary, monitored: usize, duration_secs: f64) {
        let inner = self.inner();
        inner.tick_latency_seconds.observe(duration_secs);
        inner.ticks_completed.inc();
        inner.containers_monitored.set(monitored as i64);
        inner.containers_skipped.inc_by(summary.skipped as u64);
        inner.containers_failed.inc_by(summary.failed as u64);
    }

    /// Record a tick aborted by a listing failure
    pub fn record_tick_failure(&self, duration_secs: f64) {
        let inner = self.inner();
        inner.tick_latency_seconds.observe(duration_secs);
        inner.ticks_failed.inc();
    }
}

/// Structured logger for agent events
///
/// Emits event-tagged JSON records so log shippers can pick out sampling
/// results without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, poll_interval_secs: u64) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            poll_interval_secs = poll_interval_secs,
            "Stats agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Stats agent shutting down"
        );
    }

    /// Log a completed tick and one record per sampled container
    pub fn log_tick(
        &self,
        sequence: u64,
        summary: &TickSummary,
        containers: &HashMap<ContainerId, HistoryEntry>,
    ) {
        info!(
            event = "tick_completed",
            node = %self.node_name,
            sequence = sequence,
            listed = summary.listed,
            sampled = summary.sampled,
            skipped = summary.skipped,
            failed = summary.failed,
            pruned = summary.pruned,
            "Sampling tick complete"
        );

        for (id, entry) in containers {
            self.log_container(id, entry);
        }
    }

    pub fn log_container(&self, id: &ContainerId, entry: &HistoryEntry) {
        info!(
            event = "container_sampled",
            node = %self.node_name,
            container_id = %id,
            name = %entry.name,
            cpu_percent = entry.cpu_percent,
            mem_used_no_cache = entry.mem_used_no_cache,
            mem_percent = entry.mem_percent,
            "Container usage"
        );
    }

    pub fn log_tick_failure(&self, sequence: u64, error: &str) {
        warn!(
            event = "tick_failed",
            node = %self.node_name,
            sequence = sequence,
            error = %error,
            "Sampling tick failed, retrying next interval"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_metrics_record() {
        // Prometheus uses a process-global registry, so the handle is shared.
        let metrics = AgentMetrics::new();
        let summary = TickSummary {
            listed: 3,
            sampled: 2,
            skipped: 1,
            ..Default::default()
        };

        metrics.record_tick(&summary, 2, 0.004);
        metrics.record_tick_failure(0.001);

        assert!(metrics.inner().ticks_completed.get() >= 1);
        assert!(metrics.inner().ticks_failed.get() >= 1);
        assert!(metrics.inner().containers_skipped.get() >= 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
