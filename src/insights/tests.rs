use super::*;
use crate::config::OutcomesConfig;
use crate::outcomes::Outcome;
use crate::registry::{BackendCapabilities, RegistrationSource};
use crate::weights::{AdaptationSettings, FactorWeights};

struct Fixture {
    registry: Arc<Registry>,
    recorder: Arc<OutcomeRecorder>,
    insights: InsightsAggregator,
}

fn fixture() -> Fixture {
    let registry = Arc::new(Registry::new());
    let recorder = Arc::new(OutcomeRecorder::new(
        Arc::clone(&registry),
        OutcomesConfig::default(),
    ));
    let weights = Arc::new(
        FactorWeightAdapter::new(AdaptationSettings::default(), FactorWeights::default())
            .unwrap(),
    );
    let engine = Arc::new(ScoringEngine::new(
        Arc::clone(&registry),
        Arc::clone(&recorder),
        Arc::clone(&weights),
    ));
    let insights = InsightsAggregator::new(
        Arc::clone(&registry),
        Arc::clone(&recorder),
        weights,
        engine,
    );
    Fixture {
        registry,
        recorder,
        insights,
    }
}

fn record(f: &Fixture, backend: &str, content_type: &str, success: bool, duration_ms: f64) {
    record_at(f, backend, content_type, success, duration_ms, Utc::now());
}

fn record_at(
    f: &Fixture,
    backend: &str,
    content_type: &str,
    success: bool,
    duration_ms: f64,
    timestamp: DateTime<Utc>,
) {
    f.recorder
        .record_outcome(&Outcome {
            backend_id: backend.to_string(),
            success,
            duration_ms,
            content_type: content_type.to_string(),
            content_size: 100,
            error: (!success).then(|| "upload failed".to_string()),
            timestamp,
        })
        .unwrap();
}

#[test]
fn empty_router_snapshot() {
    let f = fixture();
    let snapshot = f.insights.get_insights(&InsightsFilter::default());

    assert_eq!(snapshot.factor_weights.len(), 5);
    assert!((snapshot.factor_weights.values().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(snapshot.backend_scores.is_empty());
    assert!(snapshot.backend_success_rates.is_empty());
    assert_eq!(snapshot.latency_stats.sample_count, 0);
}

#[test]
fn unfiltered_snapshot_covers_every_backend() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();
    f.registry.register("s3", BackendCapabilities::default()).unwrap();
    record(&f, "ipfs", "image/jpeg", true, 40.0);
    record(&f, "s3", "video/mp4", false, 400.0);

    let snapshot = f.insights.get_insights(&InsightsFilter::default());

    assert_eq!(snapshot.backend_scores.len(), 2);
    assert_eq!(snapshot.backend_success_rates.len(), 2);
    assert!(snapshot.backend_success_rates["ipfs"] > snapshot.backend_success_rates["s3"]);
    assert_eq!(snapshot.content_type_distribution["image/jpeg"], 1);
    assert_eq!(snapshot.content_type_distribution["video/mp4"], 1);
    assert_eq!(snapshot.latency_stats.sample_count, 2);
    assert_eq!(snapshot.latency_stats.max, 400.0);
    assert_eq!(
        snapshot.backend_usage_stats["s3"].last_error.as_deref(),
        Some("upload failed")
    );
}

#[test]
fn content_type_filter_keeps_only_backends_with_history() {
    let f = fixture();
    for id in ["ipfs", "s3", "arweave"] {
        f.registry.register(id, BackendCapabilities::default()).unwrap();
    }
    record(&f, "ipfs", "image/jpeg", true, 30.0);
    record(&f, "ipfs", "image/jpeg", false, 30.0);
    record(&f, "ipfs", "text/plain", true, 30.0);
    record(&f, "s3", "text/plain", true, 90.0);

    let snapshot = f
        .insights
        .get_insights(&InsightsFilter::for_content_type("image/jpeg"));

    assert!((snapshot.factor_weights.values().sum::<f64>() - 1.0).abs() < 1e-9);
    let keys: Vec<&String> = snapshot.backend_success_rates.keys().collect();
    assert_eq!(keys, vec!["ipfs"]);
    assert_eq!(snapshot.backend_success_rates["ipfs"], 0.5);
    assert_eq!(snapshot.content_type_distribution.len(), 1);
    assert_eq!(snapshot.content_type_distribution["image/jpeg"], 2);
    assert_eq!(snapshot.latency_stats.sample_count, 2);
    assert_eq!(snapshot.backend_scores.len(), 1);
}

#[test]
fn content_type_filter_without_history_is_empty() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();
    record(&f, "ipfs", "text/plain", true, 30.0);

    let snapshot = f
        .insights
        .get_insights(&InsightsFilter::for_content_type("image/png"));
    assert!(snapshot.backend_success_rates.is_empty());
    assert!(snapshot.backend_scores.is_empty());
    assert_eq!(snapshot.factor_weights.len(), 5);
}

#[test]
fn backend_filter_narrows_every_section() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();
    f.registry.register("s3", BackendCapabilities::default()).unwrap();
    record(&f, "ipfs", "image/jpeg", true, 30.0);
    record(&f, "s3", "image/jpeg", true, 60.0);

    let snapshot = f.insights.get_insights(&InsightsFilter::for_backend("s3"));
    assert_eq!(snapshot.backend_scores.len(), 1);
    assert_eq!(snapshot.backend_scores[0].backend_id, "s3");
    assert_eq!(
        snapshot.backend_success_rates.keys().collect::<Vec<_>>(),
        vec!["s3"]
    );
    assert_eq!(snapshot.latency_stats.max, 60.0);
}

#[test]
fn lazily_registered_backend_reports_its_source() {
    let f = fixture();
    record(&f, "ghost_backend", "image/jpeg", true, 10.0);

    let snapshot = f.insights.get_insights(&InsightsFilter::default());
    assert_eq!(
        snapshot.backend_usage_stats["ghost_backend"].source,
        Some(RegistrationSource::Lazy)
    );
}

#[test]
fn time_window_uses_recent_samples_only() {
    let f = fixture();
    let old = Utc::now() - Duration::hours(6);
    record_at(&f, "ipfs", "image/jpeg", false, 900.0, old);
    record_at(&f, "ipfs", "image/jpeg", false, 900.0, old);
    record(&f, "ipfs", "image/jpeg", true, 20.0);

    let filter = InsightsFilter {
        time_window_hours: Some(1),
        ..Default::default()
    };
    let snapshot = f.insights.get_insights(&filter);

    assert_eq!(snapshot.backend_success_rates["ipfs"], 1.0);
    assert_eq!(snapshot.content_type_distribution["image/jpeg"], 1);
    assert_eq!(snapshot.latency_stats.sample_count, 1);
    // lifetime counters are not windowed
    assert_eq!(snapshot.backend_usage_stats["ipfs"].usage_count, 3);
}

#[test]
fn collect_skips_unrequested_sections() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();
    record(&f, "ipfs", "image/jpeg", true, 20.0);

    let sections = Sections {
        success_rates: true,
        ..Sections::NONE
    };
    let snapshot = f.insights.collect(&InsightsFilter::default(), sections);
    assert_eq!(snapshot.backend_success_rates.len(), 1);
    assert!(snapshot.factor_weights.is_empty());
    assert!(snapshot.backend_scores.is_empty());
    assert_eq!(snapshot.latency_stats.sample_count, 0);
}

#[test]
fn aggregate_success_rate_is_usage_weighted() {
    let f = fixture();
    assert_eq!(f.insights.aggregate_success_rate(&[]), None);

    for _ in 0..3 {
        record(&f, "a", "x/y", true, 1.0);
    }
    record(&f, "b", "x/y", false, 1.0);

    let a = f.recorder.get_profile("a").unwrap().success_rate;
    let b = f.recorder.get_profile("b").unwrap().success_rate;
    let expected = (3.0 * a + b) / 4.0;
    let aggregate = f.insights.aggregate_success_rate(&[]).unwrap();
    assert!((aggregate - expected).abs() < 1e-12);

    let only_b = f.insights.aggregate_success_rate(&["b".to_string()]).unwrap();
    assert!((only_b - b).abs() < 1e-12);
}

#[test]
fn scoped_collect_limits_backends() {
    let f = fixture();
    for id in ["a", "b", "c"] {
        f.registry.register(id, BackendCapabilities::default()).unwrap();
        record(&f, id, "x/y", true, 10.0);
    }

    let scope = vec!["a".to_string(), "c".to_string()];
    let snapshot = f
        .insights
        .collect_scoped(&InsightsFilter::default(), &scope, Sections::ALL);
    assert_eq!(
        snapshot.backend_success_rates.keys().collect::<Vec<_>>(),
        vec!["a", "c"]
    );
    assert_eq!(snapshot.backend_scores.len(), 2);
    assert_eq!(snapshot.latency_stats.sample_count, 2);
}

#[test]
fn window_start_saturates_for_huge_windows() {
    let now = Utc::now();
    assert_eq!(window_start(now, 2), now - Duration::hours(2));
    assert_eq!(window_start(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
}
