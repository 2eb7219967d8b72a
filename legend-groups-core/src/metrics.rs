//! Runtime counters.
//!
//! Lock-free `AtomicU64` counters incremented on the hot paths (prefix and
//! language lookups, membership changes, sweeps) and read on export.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for high-frequency events.
#[derive(Debug)]
pub struct GroupCounters {
    /// Prefix lookups answered from the cache.
    pub prefix_hits: AtomicU64,
    /// Prefix lookups that went to the store.
    pub prefix_misses: AtomicU64,
    /// Language lookups answered from the cache.
    pub language_hits: AtomicU64,
    /// Language lookups that went to the store.
    pub language_misses: AtomicU64,
    /// Memberships created or extended.
    pub memberships_added: AtomicU64,
    /// Memberships removed by command.
    pub memberships_removed: AtomicU64,
    /// Players whose expired memberships were purged.
    pub expired_purges: AtomicU64,
    /// Completed expiry sweeps.
    pub sweeps_completed: AtomicU64,
    /// Players seen for the first time.
    pub players_created: AtomicU64,
}

impl GroupCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prefix_hits: AtomicU64::new(0),
            prefix_misses: AtomicU64::new(0),
            language_hits: AtomicU64::new(0),
            language_misses: AtomicU64::new(0),
            memberships_added: AtomicU64::new(0),
            memberships_removed: AtomicU64::new(0),
            expired_purges: AtomicU64::new(0),
            sweeps_completed: AtomicU64::new(0),
            players_created: AtomicU64::new(0),
        }
    }

    /// Add one to `counter`.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` to `counter`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            prefix_hits: self.prefix_hits.load(Ordering::Relaxed),
            prefix_misses: self.prefix_misses.load(Ordering::Relaxed),
            language_hits: self.language_hits.load(Ordering::Relaxed),
            language_misses: self.language_misses.load(Ordering::Relaxed),
            memberships_added: self.memberships_added.load(Ordering::Relaxed),
            memberships_removed: self.memberships_removed.load(Ordering::Relaxed),
            expired_purges: self.expired_purges.load(Ordering::Relaxed),
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            players_created: self.players_created.load(Ordering::Relaxed),
        }
    }
}

impl Default for GroupCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Prefix cache hits.
    pub prefix_hits: u64,
    /// Prefix cache misses.
    pub prefix_misses: u64,
    /// Language cache hits.
    pub language_hits: u64,
    /// Language cache misses.
    pub language_misses: u64,
    /// Memberships created or extended.
    pub memberships_added: u64,
    /// Memberships removed by command.
    pub memberships_removed: u64,
    /// Players purged of expired memberships.
    pub expired_purges: u64,
    /// Completed sweeps.
    pub sweeps_completed: u64,
    /// New players.
    pub players_created: u64,
}

impl CounterSnapshot {
    /// Prefix cache hit ratio in `[0, 1]`; `0` before any lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn prefix_hit_ratio(&self) -> f64 {
        let total = self.prefix_hits + self.prefix_misses;
        if total == 0 {
            0.0
        } else {
            self.prefix_hits as f64 / total as f64
        }
    }

    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("legend_groups_prefix_lookups_total{result=\"hit\"}", "Prefix lookups", self.prefix_hits),
            ("legend_groups_prefix_lookups_total{result=\"miss\"}", "", self.prefix_misses),
            ("legend_groups_language_lookups_total{result=\"hit\"}", "Language lookups", self.language_hits),
            ("legend_groups_language_lookups_total{result=\"miss\"}", "", self.language_misses),
            ("legend_groups_memberships_added_total", "Memberships created or extended", self.memberships_added),
            ("legend_groups_memberships_removed_total", "Memberships removed by command", self.memberships_removed),
            ("legend_groups_expired_purges_total", "Players purged of expired memberships", self.expired_purges),
            ("legend_groups_sweeps_total", "Completed expiry sweeps", self.sweeps_completed),
            ("legend_groups_players_created_total", "Players seen for the first time", self.players_created),
        ];
        let mut out = String::new();
        for (metric, help, value) in rows {
            if !help.is_empty() {
                let name = metric.split('{').next().unwrap_or(metric);
                out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n"));
            }
            out.push_str(&format!("{metric} {value}\n"));
        }
        out
    }
}
