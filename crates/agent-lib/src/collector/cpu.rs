//! CPU percentage from cumulative counters
//!
//! Docker reports CPU usage as counters that only grow while the container
//! lives. A rate needs two samples: the container's delta is divided by the
//! host's delta and scaled by the number of CPUs, so 100% means one full
//! core. This is the same formula `docker stats` uses.

use crate::models::{HistoryEntry, StatsSnapshot};

/// Number of CPUs to scale by
///
/// Some runtimes leave `online_cpus` at 0; the per-core array length is the
/// fallback.
pub fn effective_cpus(snapshot: &StatsSnapshot) -> u32 {
    if snapshot.online_cpus == 0 {
        snapshot.per_core_usage.len() as u32
    } else {
        snapshot.online_cpus
    }
}

/// CPU percent between a previous counter pair and `snapshot`
///
/// Returns 0.0 unless both deltas are strictly positive.
pub fn cpu_percent(prev_cpu: u64, prev_system: u64, snapshot: &StatsSnapshot) -> f64 {
    let cpu_delta = i128::from(snapshot.cpu_total) - i128::from(prev_cpu);
    let system_delta = i128::from(snapshot.system_total) - i128::from(prev_system);

    if cpu_delta > 0 && system_delta > 0 {
        let cpus = f64::from(effective_cpus(snapshot));
        (cpu_delta as f64 / system_delta as f64) * cpus * 100.0
    } else {
        0.0
    }
}

/// Update `entry` with the CPU percent for `snapshot`
///
/// The stored counters are replaced with the snapshot's on every call, even
/// when the deltas are unusable. The first sample of an entry has nothing to
/// measure against and always reports 0.0.
pub fn apply_cpu(entry: &mut HistoryEntry, snapshot: &StatsSnapshot) {
    let prev_cpu = entry.prev_cpu_total;
    let prev_system = entry.prev_system_total;
    let has_baseline = entry.samples > 0;

    entry.prev_cpu_total = snapshot.cpu_total;
    entry.prev_system_total = snapshot.system_total;
    entry.samples += 1;

    entry.cpu_percent = if has_baseline {
        cpu_percent(prev_cpu, prev_system, snapshot)
    } else {
        0.0
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cpu_total: u64, system_total: u64, online_cpus: u32) -> StatsSnapshot {
        StatsSnapshot {
            cpu_total,
            system_total,
            online_cpus,
            ..Default::default()
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_first_sample_reports_zero() {
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(1000, 5000, 2));

        assert_eq!(entry.cpu_percent, 0.0);
        assert_eq!(entry.prev_cpu_total, 1000);
        assert_eq!(entry.prev_system_total, 5000);
        assert_eq!(entry.samples, 1);
    }

    #[test]
    fn test_first_sample_ignores_lifetime_counters() {
        // A long-running container has large counters on its first sample
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(4_000_000, 9_000_000, 8));

        assert_eq!(entry.cpu_percent, 0.0);

        apply_cpu(&mut entry, &snapshot(4_000_500, 9_001_000, 8));
        assert_close(entry.cpu_percent, 400.0);
        assert_eq!(entry.samples, 2);
    }

    #[test]
    fn test_second_sample_uses_deltas() {
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(1000, 5000, 2));
        apply_cpu(&mut entry, &snapshot(1300, 5500, 2));

        // (300 / 500) * 2 * 100
        assert_close(entry.cpu_percent, 120.0);
        assert_eq!(entry.prev_cpu_total, 1300);
        assert_eq!(entry.prev_system_total, 5500);
    }

    #[test]
    fn test_zero_cpu_delta_reports_zero() {
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(1000, 5000, 2));
        apply_cpu(&mut entry, &snapshot(1000, 6000, 2));

        assert_eq!(entry.cpu_percent, 0.0);
    }

    #[test]
    fn test_zero_system_delta_reports_zero() {
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(1000, 5000, 2));
        apply_cpu(&mut entry, &snapshot(2000, 5000, 2));

        assert_eq!(entry.cpu_percent, 0.0);
    }

    #[test]
    fn test_counter_reset_reports_zero_and_overwrites() {
        let mut entry = HistoryEntry::new("c1");
        apply_cpu(&mut entry, &snapshot(9000, 50_000, 4));
        apply_cpu(&mut entry, &snapshot(100, 40_000, 4));

        assert_eq!(entry.cpu_percent, 0.0);
        assert_eq!(entry.prev_cpu_total, 100);
        assert_eq!(entry.prev_system_total, 40_000);

        // Next sample measures from the reset counters
        apply_cpu(&mut entry, &snapshot(600, 41_000, 4));
        assert_close(entry.cpu_percent, 200.0);
    }

    #[test]
    fn test_online_cpus_fallback_to_per_core_length() {
        let snap = StatsSnapshot {
            online_cpus: 0,
            per_core_usage: vec![10, 20, 30, 40],
            ..Default::default()
        };
        assert_eq!(effective_cpus(&snap), 4);

        let snap = StatsSnapshot {
            cpu_total: 1300,
            system_total: 5500,
            online_cpus: 0,
            per_core_usage: vec![0; 4],
            ..Default::default()
        };
        assert_close(cpu_percent(1000, 5000, &snap), 240.0);
    }

    #[test]
    fn test_online_cpus_preferred_over_per_core_length() {
        let snap = StatsSnapshot {
            online_cpus: 2,
            per_core_usage: vec![0; 8],
            ..Default::default()
        };
        assert_eq!(effective_cpus(&snap), 2);
    }

    #[test]
    fn test_unknown_cpu_count_reports_zero() {
        let snap = snapshot(1300, 5500, 0);
        assert_eq!(cpu_percent(1000, 5000, &snap), 0.0);
    }
}
