//! Per-container history table
//!
//! Holds everything that must survive between sampling ticks: the previous
//! CPU counters needed for delta calculations and the last derived
//! percentages. Entries are created lazily on first successful sample and
//! dropped as soon as the container leaves the running list.

use crate::models::{ContainerId, HistoryEntry};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Mapping from container identity to accumulated sampling state
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: HashMap<ContainerId, HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ContainerId) -> Option<&HistoryEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.entries.contains_key(id)
    }

    /// Create the entry if missing, then apply `mutate` to it
    ///
    /// `name` is only used when the entry is created; an existing entry
    /// keeps the name it was first seen with.
    pub fn upsert<F>(&mut self, id: &ContainerId, name: &str, mutate: F) -> &HistoryEntry
    where
        F: FnOnce(&mut HistoryEntry),
    {
        let entry = self.entries.entry(id.clone()).or_insert_with(|| {
            debug!(container_id = %id, name = %name, "Tracking new container");
            HistoryEntry::new(name)
        });
        mutate(&mut *entry);
        entry
    }

    /// Remove every entry whose id is not in `live`
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, live: &HashSet<ContainerId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| {
            let keep = live.contains(id);
            if !keep {
                debug!(container_id = %id, "Dropping history for stopped container");
            }
            keep
        });
        before - self.entries.len()
    }

    /// Point-in-time copy of the whole table
    pub fn snapshot(&self) -> HashMap<ContainerId, HistoryEntry> {
        self.entries.clone()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(ids: &[&str]) -> HashSet<ContainerId> {
        ids.iter().map(|id| ContainerId::new(*id)).collect()
    }

    #[test]
    fn test_upsert_creates_entry_with_name() {
        let mut store = HistoryStore::new();
        let id = ContainerId::new("c1");

        store.upsert(&id, "web", |entry| entry.cpu_percent = 12.5);

        let entry = store.get(&id).unwrap();
        assert_eq!(entry.name, "web");
        assert_eq!(entry.cpu_percent, 12.5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_keeps_original_name() {
        let mut store = HistoryStore::new();
        let id = ContainerId::new("c1");

        store.upsert(&id, "web", |_| {});
        store.upsert(&id, "renamed", |entry| entry.prev_cpu_total = 42);

        let entry = store.get(&id).unwrap();
        assert_eq!(entry.name, "web");
        assert_eq!(entry.prev_cpu_total, 42);
    }

    #[test]
    fn test_prune_removes_absent_ids() {
        let mut store = HistoryStore::new();
        for id in ["c1", "c2", "c3"] {
            store.upsert(&ContainerId::new(id), id, |_| {});
        }

        let removed = store.prune(&live(&["c1", "c3"]));

        assert_eq!(removed, 1);
        assert!(store.contains(&ContainerId::new("c1")));
        assert!(!store.contains(&ContainerId::new("c2")));
        assert!(store.contains(&ContainerId::new("c3")));
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut store = HistoryStore::new();
        for id in ["c1", "c2", "c3"] {
            store.upsert(&ContainerId::new(id), id, |_| {});
        }
        let live = live(&["c2"]);

        store.prune(&live);
        let mut once: Vec<_> = store.ids().cloned().collect();
        once.sort();

        assert_eq!(store.prune(&live), 0);
        let mut twice: Vec<_> = store.ids().cloned().collect();
        twice.sort();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_prune_with_empty_live_set_clears_store() {
        let mut store = HistoryStore::new();
        store.upsert(&ContainerId::new("c1"), "web", |_| {});

        store.prune(&HashSet::new());

        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut store = HistoryStore::new();
        let id = ContainerId::new("c1");
        store.upsert(&id, "web", |entry| entry.cpu_percent = 1.0);

        let snapshot = store.snapshot();
        store.upsert(&id, "web", |entry| entry.cpu_percent = 2.0);

        assert_eq!(snapshot[&id].cpu_percent, 1.0);
        assert_eq!(store.get(&id).unwrap().cpu_percent, 2.0);
    }
}
