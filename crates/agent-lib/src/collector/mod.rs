//! Container sampling
//!
//! This module turns raw runtime statistics into per-container CPU and
//! memory percentages. The runtime is reached through the
//! [`ContainerRuntime`] trait; [`DockerRuntime`] is the Docker Engine
//! implementation used by the agent.

mod cpu;
mod docker;
mod r#loop;
mod memory;
mod sampler;


pub use cpu::{apply_cpu, cpu_percent, effective_cpus};
pub use docker::DockerRuntime;
pub use memory::{apply_memory, memory_usage, MemoryUsage};
pub use r#loop::{LoopConfig, SamplingLoop, SamplingLoopBuilder, TickReport};
pub use sampler::{Sampler, TickSummary};

use crate::error::RuntimeResult;
use crate::models::{ContainerId, ContainerInfo, StatsSnapshot};
use std::sync::Arc;

pub use async_trait::async_trait;

/// Source of running containers and their raw statistics
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List the containers currently running on this host
    async fn list_running_containers(&self) -> RuntimeResult<Vec<ContainerInfo>>;

    /// Fetch one statistics sample for a container
    async fn fetch_stats(&self, id: &ContainerId) -> RuntimeResult<StatsSnapshot>;
}

/// Connect to the Docker engine, either at `docker_host` or via local defaults
pub fn create_runtime(docker_host: Option<&str>) -> anyhow::Result<Arc<dyn ContainerRuntime>> {
    let runtime = match docker_host {
        Some(host) if !host.is_empty() => {
            tracing::info!(docker_host = %host, "Connecting to Docker engine");
            DockerRuntime::connect(host)?
        }
        _ => {
            tracing::info!("Connecting to local Docker engine");
            DockerRuntime::connect_local()?
        }
    };
    Ok(Arc::new(runtime))
}
