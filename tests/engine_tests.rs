// tests/engine_tests.rs
use chrono::Utc;
use proptest::prelude::*;
use std::sync::Arc;
use traffinity::config::{AdmissionMode, Config};
use traffinity::engine::Engine;
use traffinity::error::RouterError;
use traffinity::health::{HealthReport, HealthSnapshot};
use traffinity::registry::{Address, Registry};

fn engine() -> Engine {
    Engine::new(&Config::default(), None)
}

fn healthy_report() -> HealthReport {
    HealthReport {
        cpu_percent: 30.0,
        memory_percent: 40.0,
        latency_millis: 100,
        request_count: 5,
    }
}

#[test]
fn register_rejects_duplicate_addresses() {
    let engine = engine();
    engine.register("host1", 8001).unwrap();
    let err = engine.register("host1", 8001).unwrap_err();
    assert!(matches!(err, RouterError::DuplicateBackend(_)));
    assert_eq!(engine.backends().len(), 1);
}

#[test]
fn register_validates_address() {
    let engine = engine();
    assert!(matches!(
        engine.register("", 8001).unwrap_err(),
        RouterError::InvalidInput(_)
    ));
    assert!(matches!(
        engine.register("host1", 0).unwrap_err(),
        RouterError::InvalidInput(_)
    ));
    assert!(engine.backends().is_empty());
}

#[test]
fn unreported_backend_is_never_picked() {
    let engine = engine();
    let backend = engine.register("host1", 8001).unwrap();

    assert!(matches!(
        engine.pick().unwrap_err(),
        RouterError::NoBackendAvailable
    ));

    engine.report_health(&backend.id, healthy_report()).unwrap();
    assert_eq!(engine.pick().unwrap().id, backend.id);
}

#[test]
fn stale_backend_is_never_picked() {
    let engine = engine();
    let backend = engine.register("host1", 8001).unwrap();

    // Good numbers, but the snapshot is past the staleness window.
    engine.health_tracker().record(
        &backend.id,
        HealthSnapshot {
            cpu_percent: 10.0,
            memory_percent: 10.0,
            latency_millis: 50,
            request_count: 1,
            observed_at: Utc::now() - chrono::Duration::seconds(60),
        },
    );

    assert!(matches!(
        engine.pick().unwrap_err(),
        RouterError::NoBackendAvailable
    ));
}

#[test]
fn report_for_a_deregistered_backend_leaves_no_trace() {
    let engine = engine();
    let backend = engine.register("host1", 8001).unwrap();
    engine.report_health(&backend.id, healthy_report()).unwrap();
    engine.deregister(&backend.id).unwrap();

    let err = engine
        .report_health(&backend.id, healthy_report())
        .unwrap_err();
    assert!(matches!(err, RouterError::UnknownBackend(_)));
    assert!(engine.health_view().is_empty());
    assert_eq!(engine.summary().total_requests, 0);
}

#[test]
fn racing_reports_and_deregistrations_never_orphan_a_snapshot() {
    let engine = Arc::new(engine());

    // Whatever order the two threads land in, the tracker must end up
    // without an entry for the removed id.
    for round in 0..50 {
        let backend = engine.register("host1", 8001).unwrap();
        let id = backend.id.clone();

        let reporter = {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            std::thread::spawn(move || {
                let _ = engine.report_health(&id, healthy_report());
            })
        };
        let remover = {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            std::thread::spawn(move || {
                engine.deregister(&id).unwrap();
            })
        };
        reporter.join().unwrap();
        remover.join().unwrap();

        assert!(
            engine.health_view().is_empty(),
            "round {round}: orphan snapshot for {id}"
        );
    }
}

#[test]
fn round_robin_visits_each_eligible_backend_once_per_cycle() {
    let engine = engine();
    let mut ids = Vec::new();
    for port in [8001, 8002, 8003] {
        let backend = engine.register("host", port).unwrap();
        engine.report_health(&backend.id, healthy_report()).unwrap();
        ids.push(backend.id.clone());
    }

    let picked: Vec<String> = (0..6).map(|_| engine.pick().unwrap().id.clone()).collect();
    assert_eq!(picked[..3], ids[..]);
    assert_eq!(picked[3..], ids[..]);
}

#[test]
fn backend_over_cpu_threshold_is_skipped() {
    let engine = engine();
    let a = engine.register("host1", 8001).unwrap();
    let b = engine.register("host2", 8002).unwrap();

    engine.report_health(&a.id, healthy_report()).unwrap();
    engine
        .report_health(
            &b.id,
            HealthReport {
                cpu_percent: 90.0,
                memory_percent: 40.0,
                latency_millis: 100,
                request_count: 3,
            },
        )
        .unwrap();

    for _ in 0..5 {
        assert_eq!(engine.pick().unwrap().id, a.id);
    }
}

#[test]
fn deregistration_narrows_then_empties_the_rotation() {
    let engine = engine();
    let a = engine.register("host1", 8001).unwrap();
    let b = engine.register("host2", 8002).unwrap();
    engine.report_health(&a.id, healthy_report()).unwrap();
    engine.report_health(&b.id, healthy_report()).unwrap();

    engine.pick().unwrap();
    engine.deregister(&a.id).unwrap();

    for _ in 0..3 {
        assert_eq!(engine.pick().unwrap().id, b.id);
    }

    engine.deregister(&b.id).unwrap();
    assert!(matches!(
        engine.pick().unwrap_err(),
        RouterError::NoBackendAvailable
    ));
}

#[test]
fn route_rejects_a_source_past_the_threshold_without_touching_others() {
    // Hour-long window so wall-clock jitter cannot reset it mid-test;
    // the ceiling works out to two requests per window.
    let mut config = Config::default();
    config.overload.window_secs = 3600;
    config.overload.max_requests_per_second = 2.0 / 3600.0;
    let engine = Engine::new(&config, None);

    let backend = engine.register("host1", 8001).unwrap();
    engine.report_health(&backend.id, healthy_report()).unwrap();

    assert!(engine.route("ip1").is_ok());
    assert!(engine.route("ip1").is_ok());
    for _ in 0..3 {
        assert!(matches!(
            engine.route("ip1").unwrap_err(),
            RouterError::Rejected(_)
        ));
    }

    assert!(engine.route("ip2").is_ok());
    assert_eq!(engine.alerts().len(), 1);
}

#[test]
fn reported_rate_detection_raises_one_alert() {
    let mut config = Config::default();
    config.overload.mode = AdmissionMode::Reported;
    let engine = Engine::new(&config, None);

    assert!(engine.detect_threat("ip1", 1500.0));
    assert_eq!(engine.alerts().len(), 1);

    assert!(!engine.detect_threat("ip2", 50.0));
    assert_eq!(engine.alerts().len(), 1);
}

#[test]
fn summary_averages_latency_over_fresh_snapshots() {
    let engine = engine();
    let a = engine.register("host1", 8001).unwrap();
    let b = engine.register("host2", 8002).unwrap();

    engine
        .report_health(
            &a.id,
            HealthReport {
                cpu_percent: 30.0,
                memory_percent: 40.0,
                latency_millis: 100,
                request_count: 5,
            },
        )
        .unwrap();
    engine
        .report_health(
            &b.id,
            HealthReport {
                cpu_percent: 30.0,
                memory_percent: 40.0,
                latency_millis: 300,
                request_count: 3,
            },
        )
        .unwrap();

    let summary = engine.summary();
    assert_eq!(summary.average_latency, 200.0);
    assert_eq!(summary.total_requests, 8);
    assert_eq!(summary.live_backend_count, 2);
    assert_eq!(summary.total_backends, 2);
}

#[test]
fn summary_of_an_empty_engine_is_all_zeroes() {
    let summary = engine().summary();
    assert_eq!(summary.average_latency, 0.0);
    assert_eq!(summary.total_requests, 0);
    assert_eq!(summary.live_backend_count, 0);
    assert_eq!(summary.total_backends, 0);
}

proptest! {
    /// Any interleaving of registrations and deregistrations leaves the
    /// registry without duplicate addresses, and its size equal to the net
    /// number of successful registrations.
    #[test]
    fn registry_holds_the_uniqueness_invariant(
        ops in proptest::collection::vec((0u8..6, any::<bool>()), 1..80)
    ) {
        let registry = Registry::new();
        let mut live: Vec<(String, u16)> = Vec::new();

        for (slot, do_register) in ops {
            let port = 8000 + slot as u16;
            if do_register {
                let already = live.iter().any(|(_, p)| *p == port);
                match registry.register(Address::new("host", port)) {
                    Ok(backend) => {
                        prop_assert!(!already);
                        live.push((backend.id.clone(), port));
                    }
                    Err(err) => {
                        prop_assert!(already);
                        prop_assert!(matches!(err, RouterError::DuplicateBackend(_)));
                    }
                }
            } else if let Some((id, _)) = live.pop() {
                registry.deregister(&id).unwrap();
            }
        }

        let listed = registry.list();
        let total = listed.len();
        let mut addresses: Vec<String> =
            listed.iter().map(|b| b.address.to_string()).collect();
        addresses.sort();
        addresses.dedup();
        prop_assert_eq!(addresses.len(), total);
        prop_assert_eq!(total, live.len());
    }
}
