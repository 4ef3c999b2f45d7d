//! Docker Engine runtime
//!
//! Lists running containers and pulls one-shot stats through the Engine API.
//! Docker's stats payload is loosely typed (most counters are optional and
//! the memory breakdown differs between cgroup v1 and v2); this adapter
//! resolves it into a [`StatsSnapshot`] with explicit defaults.

use super::ContainerRuntime;
use crate::error::{RuntimeError, RuntimeResult};
use crate::models::{ContainerId, ContainerInfo, StatsSnapshot};
use anyhow::Context;
use async_trait::async_trait;
use bollard::container::{ListContainersOptions, MemoryStatsStats, Stats, StatsOptions};
use bollard::errors::Error as BollardError;
use bollard::models::ContainerSummary;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::StreamExt;
use tracing::debug;

/// Request timeout for the Engine API, in seconds
const DOCKER_TIMEOUT_SECS: u64 = 120;

/// [`ContainerRuntime`] backed by the Docker Engine API
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect_local() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;
        Ok(Self::new(docker))
    }

    /// Connect to an explicit `unix://` socket or `tcp://`/`http://` address
    pub fn connect(host: &str) -> anyhow::Result<Self> {
        let connected = if host.starts_with("unix://") {
            Docker::connect_with_unix(host, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(host, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
        };
        let docker = connected
            .with_context(|| format!("Failed to connect to Docker daemon at {}", host))?;
        Ok(Self::new(docker))
    }

    /// Build a listing entry from a container summary
    ///
    /// Docker prefixes names with `/`; the first name is used with the
    /// prefix removed, falling back to the short id.
    pub fn container_info(summary: &ContainerSummary) -> Option<ContainerInfo> {
        let id = ContainerId::new(summary.id.clone()?);
        let name = summary
            .names
            .as_ref()
            .and_then(|names| names.first())
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.short().to_string());

        Some(ContainerInfo { id, name })
    }

    /// Map a stats request failure onto the runtime error taxonomy
    pub fn classify_error(id: &ContainerId, err: BollardError) -> RuntimeError {
        match err {
            BollardError::DockerResponseServerError {
                status_code: 404, ..
            } => RuntimeError::ContainerVanished { id: id.clone() },
            err @ (BollardError::JsonDataError { .. } | BollardError::JsonSerdeError { .. }) => {
                RuntimeError::MalformedSnapshot {
                    id: id.clone(),
                    reason: err.to_string(),
                }
            }
            err => RuntimeError::Other {
                id: id.clone(),
                reason: err.to_string(),
            },
        }
    }

    /// Resolve Docker's stats payload into a snapshot
    fn snapshot_from_stats(id: &ContainerId, stats: &Stats) -> RuntimeResult<StatsSnapshot> {
        let cpu = &stats.cpu_stats;
        let system_total = cpu
            .system_cpu_usage
            .ok_or_else(|| RuntimeError::MalformedSnapshot {
                id: id.clone(),
                reason: "missing system_cpu_usage".to_string(),
            })?;

        let memory = &stats.memory_stats;
        // cgroup v1 reports page cache as `cache`. On v2 `file` is the same
        // total page cache; the docker CLI's `inactive_file` would exclude
        // active cache and no longer match the v1 figure.
        let memory_cache = match &memory.stats {
            Some(MemoryStatsStats::V1(v1)) => v1.cache,
            Some(MemoryStatsStats::V2(v2)) => v2.file,
            None => 0,
        };

        Ok(StatsSnapshot {
            cpu_total: cpu.cpu_usage.total_usage,
            system_total,
            online_cpus: cpu
                .online_cpus
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            per_core_usage: cpu.cpu_usage.percpu_usage.clone().unwrap_or_default(),
            memory_usage: memory.usage.unwrap_or(0),
            memory_cache,
            memory_limit: memory.limit.unwrap_or(0),
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running_containers(&self) -> RuntimeResult<Vec<ContainerInfo>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::RuntimeUnavailable {
                reason: e.to_string(),
            })?;

        Ok(summaries.iter().filter_map(Self::container_info).collect())
    }

    async fn fetch_stats(&self, id: &ContainerId) -> RuntimeResult<StatsSnapshot> {
        let options = StatsOptions {
            stream: false,
            one_shot: true,
        };

        let mut stream = self.docker.stats(id.as_str(), Some(options));

        match stream.next().await {
            Some(Ok(stats)) => Self::snapshot_from_stats(id, &stats),
            Some(Err(e)) => Err(Self::classify_error(id, e)),
            None => {
                debug!(container_id = %id, "Stats stream ended without a sample");
                Err(RuntimeError::ContainerVanished { id: id.clone() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_info_strips_leading_slash() {
        let summary = ContainerSummary {
            id: Some("0123456789abcdef0123".to_string()),
            names: Some(vec!["/web".to_string(), "/alias".to_string()]),
            ..Default::default()
        };

        let info = DockerRuntime::container_info(&summary).unwrap();
        assert_eq!(info.id.as_str(), "0123456789abcdef0123");
        assert_eq!(info.name, "web");
    }

    #[test]
    fn test_container_info_falls_back_to_short_id() {
        let summary = ContainerSummary {
            id: Some("0123456789abcdef0123".to_string()),
            names: None,
            ..Default::default()
        };

        let info = DockerRuntime::container_info(&summary).unwrap();
        assert_eq!(info.name, "0123456789ab");
    }

    #[test]
    fn test_container_info_requires_id() {
        let summary = ContainerSummary {
            names: Some(vec!["/web".to_string()]),
            ..Default::default()
        };

        assert!(DockerRuntime::container_info(&summary).is_none());
    }

    #[test]
    fn test_classify_not_found_as_vanished() {
        let id = ContainerId::new("c1");
        let err = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: c1".to_string(),
        };

        let classified = DockerRuntime::classify_error(&id, err);
        assert!(matches!(classified, RuntimeError::ContainerVanished { .. }));
        assert!(classified.is_benign());
    }

    #[test]
    fn test_classify_server_error_as_other() {
        let id = ContainerId::new("c1");
        let err = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "internal error".to_string(),
        };

        let classified = DockerRuntime::classify_error(&id, err);
        assert!(matches!(classified, RuntimeError::Other { .. }));
        assert!(!classified.is_benign());
    }

    #[test]
    fn test_classify_json_error_as_malformed() {
        let id = ContainerId::new("c1");
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = BollardError::JsonSerdeError { err: serde_err };

        let classified = DockerRuntime::classify_error(&id, err);
        assert!(matches!(classified, RuntimeError::MalformedSnapshot { .. }));
    }
}
