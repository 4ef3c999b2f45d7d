//! Memory usage excluding page cache

use crate::models::{HistoryEntry, StatsSnapshot};

/// Cache-adjusted memory figures for one snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub used_no_cache: i64,
    pub percent: f64,
}

/// Usage minus cache, and its fraction of the limit
///
/// Neither value is clamped: a runtime that reports more cache than usage
/// yields a negative result, as `docker stats` would.
pub fn memory_usage(snapshot: &StatsSnapshot) -> MemoryUsage {
    let used_no_cache = (i128::from(snapshot.memory_usage) - i128::from(snapshot.memory_cache))
        .clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;

    let percent = if snapshot.memory_limit != 0 {
        used_no_cache as f64 / snapshot.memory_limit as f64
    } else {
        0.0
    };

    MemoryUsage {
        used_no_cache,
        percent,
    }
}

/// Store the memory figures for `snapshot` into `entry`
pub fn apply_memory(entry: &mut HistoryEntry, snapshot: &StatsSnapshot) {
    let usage = memory_usage(snapshot);
    entry.mem_used_no_cache = usage.used_no_cache;
    entry.mem_percent = usage.percent;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(usage: u64, cache: u64, limit: u64) -> StatsSnapshot {
        StatsSnapshot {
            memory_usage: usage,
            memory_cache: cache,
            memory_limit: limit,
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_is_excluded() {
        let mut entry = HistoryEntry::new("c1");
        apply_memory(&mut entry, &snapshot(209_715_200, 104_857_600, 419_430_400));

        assert_eq!(entry.mem_used_no_cache, 104_857_600);
        assert_eq!(entry.mem_percent, 0.25);
    }

    #[test]
    fn test_unbounded_limit_reports_zero_percent() {
        let usage = memory_usage(&snapshot(209_715_200, 4096, 0));

        assert_eq!(usage.used_no_cache, 209_711_104);
        assert_eq!(usage.percent, 0.0);
    }

    #[test]
    fn test_cache_larger_than_usage_is_not_clamped() {
        let usage = memory_usage(&snapshot(1000, 3000, 4000));

        assert_eq!(usage.used_no_cache, -2000);
        assert_eq!(usage.percent, -0.5);
    }

    #[test]
    fn test_memory_does_not_touch_cpu_fields() {
        let mut entry = HistoryEntry::new("c1");
        entry.prev_cpu_total = 7;
        entry.cpu_percent = 3.5;

        apply_memory(&mut entry, &snapshot(100, 0, 200));

        assert_eq!(entry.prev_cpu_total, 7);
        assert_eq!(entry.cpu_percent, 3.5);
        assert_eq!(entry.mem_percent, 0.5);
    }
}
