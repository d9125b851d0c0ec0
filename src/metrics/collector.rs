// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        buffer
    }
}

pub struct MetricsCollector {
    // Routing
    pub route_requests_total: IntCounterVec,
    pub backend_routed_total: IntCounterVec,

    // Health
    pub health_reports_total: IntCounterVec,

    // Overload guard
    pub alerts_total: IntCounter,

    // Registry gauges
    pub registered_backends: IntGauge,
    pub eligible_backends: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let route_requests_total = IntCounterVec::new(
            Opts::new(
                "traffinity_route_requests_total",
                "Routing decisions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(route_requests_total.clone()))?;

        let backend_routed_total = IntCounterVec::new(
            Opts::new(
                "traffinity_backend_routed_total",
                "Requests routed per backend",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_routed_total.clone()))?;

        let health_reports_total = IntCounterVec::new(
            Opts::new(
                "traffinity_health_reports_total",
                "Health reports received per backend",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(health_reports_total.clone()))?;

        let alerts_total = IntCounter::new(
            "traffinity_alerts_total",
            "Suspicious traffic alerts raised",
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let registered_backends = IntGauge::new(
            "traffinity_registered_backends",
            "Backends currently registered",
        )?;
        registry.register(Box::new(registered_backends.clone()))?;

        let eligible_backends = IntGauge::new(
            "traffinity_eligible_backends",
            "Backends eligible for selection at the last pick",
        )?;
        registry.register(Box::new(eligible_backends.clone()))?;

        Ok(Self {
            route_requests_total,
            backend_routed_total,
            health_reports_total,
            alerts_total,
            registered_backends,
            eligible_backends,
        })
    }

    pub fn record_route(&self, outcome: &str, backend: Option<&str>) {
        self.route_requests_total
            .with_label_values(&[outcome])
            .inc();
        if let Some(backend) = backend {
            self.backend_routed_total
                .with_label_values(&[backend])
                .inc();
        }
    }

    pub fn record_health_report(&self, backend: &str) {
        self.health_reports_total
            .with_label_values(&[backend])
            .inc();
    }

    pub fn record_alert(&self) {
        self.alerts_total.inc();
    }

    pub fn set_registered_backends(&self, count: usize) {
        self.registered_backends.set(count as i64);
    }

    pub fn set_eligible_backends(&self, count: usize) {
        self.eligible_backends.set(count as i64);
    }
}
