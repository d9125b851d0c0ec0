// src/guard/overload.rs
use super::alerts::{Alert, AlertLog};
use crate::config::{AdmissionMode, OverloadConfig};
use crate::metrics::MetricsCollector;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}

/// Fixed-window request accounting for one source key. Created lazily on
/// first sight, evicted by the sweeper after inactivity.
#[derive(Debug)]
struct RateWindow {
    window_start: DateTime<Utc>,
    count: u64,
    last_seen: DateTime<Utc>,
    /// Set once the threshold is crossed so a hammering source raises one
    /// alert per window instead of one per rejected request.
    alerted: bool,
}

impl RateWindow {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            window_start: now,
            count: 0,
            last_seen: now,
            alerted: false,
        }
    }

    fn reset(&mut self, now: DateTime<Utc>) {
        self.window_start = now;
        self.count = 0;
        self.alerted = false;
    }
}

/// Per-source admission control. Rates are evaluated strictly per key, so
/// one noisy client cannot starve admission for anyone else, and windows
/// for different keys never serialize on each other.
pub struct OverloadGuard {
    windows: DashMap<String, RateWindow>,
    config: OverloadConfig,
    alerts: Arc<AlertLog>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl OverloadGuard {
    pub fn new(
        config: OverloadConfig,
        alerts: Arc<AlertLog>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            alerts,
            metrics,
        }
    }

    pub fn admit(&self, source_key: &str, reported_rate: Option<f64>) -> Admission {
        self.admit_at(source_key, reported_rate, Utc::now())
    }

    /// Count this request against `source_key`'s window and decide admission.
    ///
    /// In measured mode the rate comes from the server-side counter; the
    /// caller-reported figure is only consulted in reported mode, and even
    /// then the counter keeps running so the sweeper and window bookkeeping
    /// stay uniform. Rejected requests still count toward the rate.
    pub fn admit_at(
        &self,
        source_key: &str,
        reported_rate: Option<f64>,
        now: DateTime<Utc>,
    ) -> Admission {
        let mut raise_alert = false;

        let admission = {
            let mut entry = self
                .windows
                .entry(source_key.to_string())
                .or_insert_with(|| RateWindow::new(now));
            let window = entry.value_mut();

            if now.signed_duration_since(window.window_start) >= self.config.window() {
                window.reset(now);
            }
            window.count += 1;
            window.last_seen = now;

            let rate = match (self.config.mode, reported_rate) {
                (AdmissionMode::Reported, Some(rate)) => rate,
                _ => window.count as f64 / self.config.window_secs as f64,
            };

            if rate > self.config.max_requests_per_second {
                if !window.alerted {
                    window.alerted = true;
                    raise_alert = true;
                }
                Admission::Rejected
            } else {
                Admission::Admitted
            }
        };

        // Alert outside the map entry so unrelated keys are not held up.
        if raise_alert {
            warn!(
                source_key = %source_key,
                threshold = self.config.max_requests_per_second,
                "suspicious traffic, rejecting source"
            );
            self.alerts.push(Alert::suspicious_traffic(format!(
                "source {} exceeded {} requests/s",
                source_key, self.config.max_requests_per_second
            )));
            if let Some(metrics) = &self.metrics {
                metrics.record_alert();
            }
        }

        admission
    }

    /// Drop windows idle past the configured eviction age. Returns how many
    /// were removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        let idle = self.config.idle_eviction();
        self.windows
            .retain(|_, window| now.signed_duration_since(window.last_seen) < idle);
        before - self.windows.len()
    }

    pub fn tracked_sources(&self) -> usize {
        self.windows.len()
    }
}
