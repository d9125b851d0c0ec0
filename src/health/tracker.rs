// src/health/tracker.rs
use crate::config::HealthThresholds;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The health fields a backend (or whoever observes it) pushes to us.
/// The tracker stamps the observation time itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub latency_millis: u64,
    pub request_count: u64,
}

/// Last known health of one backend. Immutable value; each report replaces
/// the previous snapshot wholesale, never patches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub latency_millis: u64,
    pub request_count: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn from_report(report: HealthReport, observed_at: DateTime<Utc>) -> Self {
        Self {
            cpu_percent: report.cpu_percent,
            memory_percent: report.memory_percent,
            latency_millis: report.latency_millis,
            request_count: report.request_count,
            observed_at,
        }
    }

    pub fn is_fresh(&self, thresholds: &HealthThresholds, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.observed_at) < thresholds.staleness_window()
    }
}

/// Owns the latest snapshot per backend id. Health arrives by push; nothing
/// here probes the network, so an eligibility check never waits on I/O.
pub struct HealthTracker {
    snapshots: DashMap<String, HealthSnapshot>,
    thresholds: HealthThresholds,
}

impl HealthTracker {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            snapshots: DashMap::new(),
            thresholds,
        }
    }

    /// Replace the stored snapshot for `id`. The caller is responsible for
    /// checking that the id is registered.
    pub fn record(&self, id: &str, snapshot: HealthSnapshot) {
        tracing::debug!(
            id = %id,
            cpu = snapshot.cpu_percent,
            memory = snapshot.memory_percent,
            latency_ms = snapshot.latency_millis,
            "health report recorded"
        );
        self.snapshots.insert(id.to_string(), snapshot);
    }

    /// Drop a backend's snapshot when it leaves the registry.
    pub fn forget(&self, id: &str) {
        self.snapshots.remove(id);
    }

    pub fn is_eligible(&self, id: &str) -> bool {
        self.is_eligible_at(id, Utc::now())
    }

    /// A backend is eligible iff a snapshot exists, every threshold passes,
    /// and the snapshot is younger than the staleness window. No report at
    /// all means ineligible, never a benefit of the doubt.
    pub fn is_eligible_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        match self.snapshots.get(id) {
            Some(snapshot) => {
                snapshot.cpu_percent < self.thresholds.max_cpu_percent
                    && snapshot.memory_percent < self.thresholds.max_memory_percent
                    && snapshot.latency_millis < self.thresholds.max_latency_millis
                    && snapshot.is_fresh(&self.thresholds, now)
            }
            None => false,
        }
    }

    /// Read-only view of every stored snapshot, for the stats side.
    pub fn snapshot_all(&self) -> HashMap<String, HealthSnapshot> {
        self.snapshots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
