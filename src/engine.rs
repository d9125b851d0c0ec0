// src/engine.rs
use crate::config::Config;
use crate::error::RouterError;
use crate::guard::{Admission, Alert, AlertLog, OverloadGuard};
use crate::health::{HealthReport, HealthSnapshot, HealthTracker};
use crate::metrics::MetricsCollector;
use crate::registry::{Address, Backend, Registry};
use crate::selector::{RoundRobin, SelectionAlgorithm};
use crate::stats::{StatsAggregator, StatsSummary};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The routing engine: registry, health tracker, selector, overload guard
/// and stats aggregator behind one explicitly constructed handle.
///
/// Each structure is guarded independently, so a health report for one
/// backend never blocks a selection touching another, and rate accounting
/// for one source never serializes another. Every operation here is
/// synchronous and bounded-time; nothing waits on I/O.
///
/// State is in-process only and starts empty; persistence across restarts
/// is deliberately out of scope.
pub struct Engine {
    registry: Registry,
    tracker: HealthTracker,
    selector: RoundRobin,
    guard: Arc<OverloadGuard>,
    alerts: Arc<AlertLog>,
    aggregator: StatsAggregator,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Engine {
    pub fn new(config: &Config, metrics: Option<Arc<MetricsCollector>>) -> Self {
        let alerts = Arc::new(AlertLog::new());
        let guard = Arc::new(OverloadGuard::new(
            config.overload.clone(),
            alerts.clone(),
            metrics.clone(),
        ));

        Self {
            registry: Registry::new(),
            tracker: HealthTracker::new(config.health.clone()),
            selector: RoundRobin::new(),
            guard,
            alerts,
            aggregator: StatsAggregator::new(config.health.clone()),
            metrics,
        }
    }

    /// Register a new backend. Fails with `DuplicateBackend` if the address
    /// is already present and with `InvalidInput` on an unroutable address.
    pub fn register(&self, host: &str, port: u16) -> Result<Arc<Backend>, RouterError> {
        if host.trim().is_empty() {
            return Err(RouterError::InvalidInput("host must not be empty".into()));
        }
        if port == 0 {
            return Err(RouterError::InvalidInput("port must be non-zero".into()));
        }

        let backend = self.registry.register(Address::new(host, port))?;
        if let Some(metrics) = &self.metrics {
            metrics.set_registered_backends(self.registry.len());
        }
        Ok(backend)
    }

    pub fn deregister(&self, id: &str) -> Result<Arc<Backend>, RouterError> {
        let backend = self.registry.deregister(id)?;
        self.tracker.forget(id);
        if let Some(metrics) = &self.metrics {
            metrics.set_registered_backends(self.registry.len());
        }
        Ok(backend)
    }

    pub fn backends(&self) -> Arc<Vec<Arc<Backend>>> {
        self.registry.list()
    }

    /// Store a pushed health report, stamped with the current time. The
    /// snapshot replaces the previous one wholesale.
    pub fn report_health(
        &self,
        id: &str,
        report: HealthReport,
    ) -> Result<HealthSnapshot, RouterError> {
        if !self.registry.contains(id) {
            return Err(RouterError::UnknownBackend(id.to_string()));
        }

        let snapshot = HealthSnapshot::from_report(report, Utc::now());
        self.tracker.record(id, snapshot.clone());

        // A deregister can land between the registry check and the record.
        // Re-check and drop the snapshot so the tracker never holds an id
        // the registry no longer knows; every interleaving with
        // `deregister` converges to an empty entry either way.
        if !self.registry.contains(id) {
            self.tracker.forget(id);
            return Err(RouterError::UnknownBackend(id.to_string()));
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_health_report(id);
        }
        Ok(snapshot)
    }

    pub fn health_view(&self) -> HashMap<String, HealthSnapshot> {
        self.tracker.snapshot_all()
    }

    /// Admission check followed by backend selection, the full routing
    /// decision for one request.
    pub fn route(&self, source_key: &str) -> Result<Arc<Backend>, RouterError> {
        if self.guard.admit(source_key, None) == Admission::Rejected {
            if let Some(metrics) = &self.metrics {
                metrics.record_route("rejected", None);
            }
            return Err(RouterError::Rejected(source_key.to_string()));
        }

        match self.pick() {
            Ok(backend) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_route("routed", Some(&backend.id));
                }
                Ok(backend)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_route("no_backend", None);
                }
                Err(err)
            }
        }
    }

    pub fn pick(&self) -> Result<Arc<Backend>, RouterError> {
        self.pick_at(Utc::now())
    }

    /// Round-robin over the backends that are currently eligible. An empty
    /// eligible set is an error the caller maps to 503; the engine never
    /// retries internally.
    pub fn pick_at(&self, now: DateTime<Utc>) -> Result<Arc<Backend>, RouterError> {
        let backends = self.registry.list();
        let eligible: Vec<Arc<Backend>> = backends
            .iter()
            .filter(|b| self.tracker.is_eligible_at(&b.id, now))
            .cloned()
            .collect();

        if let Some(metrics) = &self.metrics {
            metrics.set_eligible_backends(eligible.len());
        }

        let picked = self
            .selector
            .select(&eligible)
            .ok_or(RouterError::NoBackendAvailable)?;
        debug!(id = %picked.id, eligible = eligible.len(), "picked backend");
        Ok(picked)
    }

    /// Evaluate a caller-described traffic pattern against the guard. Used
    /// by the threat-detection endpoint; counts against the source's window
    /// like any other admission check.
    pub fn detect_threat(&self, source_key: &str, reported_rate: f64) -> bool {
        self.guard.admit(source_key, Some(reported_rate)) == Admission::Rejected
    }

    pub fn summary(&self) -> StatsSummary {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> StatsSummary {
        let snapshots = self.tracker.snapshot_all();
        let backends = self.registry.list();
        let live = backends
            .iter()
            .filter(|b| self.tracker.is_eligible_at(&b.id, now))
            .count();

        self.aggregator
            .summarize(&snapshots, backends.len(), live, self.alerts.len(), now)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.all()
    }

    pub fn overload_guard(&self) -> Arc<OverloadGuard> {
        self.guard.clone()
    }

    pub fn health_tracker(&self) -> &HealthTracker {
        &self.tracker
    }
}
