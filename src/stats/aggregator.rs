// src/stats/aggregator.rs
use crate::config::HealthThresholds;
use crate::health::HealthSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_requests: u64,
    /// Mean latency across backends with a non-stale snapshot; 0 when none.
    pub average_latency: f64,
    pub live_backend_count: usize,
    pub total_backends: usize,
    pub alerts_raised: usize,
}

/// Pure read-side rollup over the health tracker's snapshots. Recomputed on
/// every call; the staleness window is the real freshness constraint, so
/// there is nothing worth caching.
pub struct StatsAggregator {
    thresholds: HealthThresholds,
}

impl StatsAggregator {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self { thresholds }
    }

    pub fn summarize(
        &self,
        snapshots: &HashMap<String, HealthSnapshot>,
        total_backends: usize,
        live_backend_count: usize,
        alerts_raised: usize,
        now: DateTime<Utc>,
    ) -> StatsSummary {
        let total_requests = snapshots.values().map(|s| s.request_count).sum();

        let fresh_latencies: Vec<f64> = snapshots
            .values()
            .filter(|s| s.is_fresh(&self.thresholds, now))
            .map(|s| s.latency_millis as f64)
            .collect();

        let average_latency = if fresh_latencies.is_empty() {
            0.0
        } else {
            fresh_latencies.iter().sum::<f64>() / fresh_latencies.len() as f64
        };

        StatsSummary {
            total_requests,
            average_latency,
            live_backend_count,
            total_backends,
            alerts_raised,
        }
    }
}
