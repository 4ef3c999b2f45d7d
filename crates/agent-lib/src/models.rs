//! Core data models for the stats agent

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque container identity assigned by the runtime
///
/// A restarted container gets a new identity, so history keyed on it is
/// never carried across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, the form `docker ps` prints
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A running container as reported by the runtime listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
}

impl ContainerInfo {
    pub fn new(id: impl Into<ContainerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Single point-in-time statistics sample for one container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Cumulative CPU time consumed by the container (nanoseconds)
    pub cpu_total: u64,
    /// Cumulative host CPU time (nanoseconds)
    pub system_total: u64,
    /// Online logical CPUs; 0 means the runtime did not report it
    pub online_cpus: u32,
    /// Per-core cumulative usage, empty when not reported
    pub per_core_usage: Vec<u64>,
    pub memory_usage: u64,
    /// Page-cache portion of `memory_usage`
    pub memory_cache: u64,
    /// Memory limit in bytes; 0 means unbounded
    pub memory_limit: u64,
}

/// Accumulated per-container state kept between ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display name, fixed at first observation
    pub name: String,
    pub prev_cpu_total: u64,
    pub prev_system_total: u64,
    /// Successful samples folded into this entry; the previous counters are
    /// only meaningful once this is non-zero
    pub samples: u64,
    pub cpu_percent: f64,
    /// Memory usage minus page cache. Signed because the runtime can report
    /// more cache than usage.
    pub mem_used_no_cache: i64,
    /// Fraction of the memory limit in use, 0 when the limit is unbounded
    pub mem_percent: f64,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
