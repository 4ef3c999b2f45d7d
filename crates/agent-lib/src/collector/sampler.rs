//! Per-tick sampling
//!
//! A tick lists the running containers, drops history for anything that is
//! gone, then samples each container once and folds the sample into its
//! history entry.

use super::{apply_cpu, apply_memory, ContainerRuntime};
use crate::error::RuntimeResult;
use crate::history::HistoryStore;
use crate::models::{ContainerId, HistoryEntry};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Counts from a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Containers in the running listing
    pub listed: usize,
    /// Containers sampled and updated
    pub sampled: usize,
    /// Containers skipped because they vanished or returned a bad payload
    pub skipped: usize,
    /// Containers skipped because of an unexpected fetch error
    pub failed: usize,
    /// History entries dropped for stopped containers
    pub pruned: usize,
}

/// Owns the history table and drives one tick at a time against a runtime
pub struct Sampler {
    runtime: Arc<dyn ContainerRuntime>,
    history: HistoryStore,
    last_summary: Option<TickSummary>,
}

impl Sampler {
    /// Create a sampler with an empty history
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_history(runtime, HistoryStore::new())
    }

    /// Create a sampler around an existing history table
    pub fn with_history(runtime: Arc<dyn ContainerRuntime>, history: HistoryStore) -> Self {
        Self {
            runtime,
            history,
            last_summary: None,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Summary of the most recent successful tick
    pub fn last_summary(&self) -> Option<&TickSummary> {
        self.last_summary.as_ref()
    }

    /// Run one sampling pass and return a copy of the updated history
    ///
    /// A failed listing aborts the tick before anything is pruned. Failures
    /// for individual containers only skip that container.
    pub async fn tick(&mut self) -> RuntimeResult<HashMap<ContainerId, HistoryEntry>> {
        let containers = self.runtime.list_running_containers().await?;

        let live: HashSet<ContainerId> = containers.iter().map(|c| c.id.clone()).collect();
        let mut summary = TickSummary {
            listed: containers.len(),
            pruned: self.history.prune(&live),
            ..Default::default()
        };

        for container in &containers {
            debug!(container_id = %container.id, name = %container.name, "Sampling container");

            match self.runtime.fetch_stats(&container.id).await {
                Ok(snapshot) => {
                    self.history.upsert(&container.id, &container.name, |entry| {
                        apply_cpu(entry, &snapshot);
                        apply_memory(entry, &snapshot);
                    });
                    summary.sampled += 1;
                }
                Err(e) if e.is_benign() => {
                    debug!(
                        container_id = %container.id,
                        error = %e,
                        "Skipping container for this tick"
                    );
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        container_id = %container.id,
                        name = %container.name,
                        error = %e,
                        "Unexpected error fetching container stats"
                    );
                    summary.failed += 1;
                }
            }
        }

        self.last_summary = Some(summary);
        Ok(self.history.snapshot())
    }
}
