use super::*;
use crate::config::OutcomesConfig;
use crate::outcomes::Outcome;
use crate::weights::{AdaptationSettings, Stance};
use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

struct Fixture {
    registry: Arc<Registry>,
    recorder: Arc<OutcomeRecorder>,
    engine: ScoringEngine,
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
    let engine = ScoringEngine::new(
        Arc::clone(&registry),
        Arc::clone(&recorder),
        Arc::clone(&weights),
    );
    Fixture {
        registry,
        recorder,
        engine,
    }
}

fn request(id: &str) -> RoutingRequest {
    RoutingRequest::new(
        id,
        ContentDescriptor {
            content_type: "application/octet-stream".to_string(),
            content_size: 4096,
            ..Default::default()
        },
    )
}

fn record(recorder: &OutcomeRecorder, backend: &str, success: bool, duration_ms: f64) {
    recorder
        .record_outcome(&Outcome {
            backend_id: backend.to_string(),
            success,
            duration_ms,
            content_type: "application/octet-stream".to_string(),
            content_size: 4096,
            error: None,
            timestamp: Utc::now(),
        })
        .unwrap();
}

fn candidate(id: &str, caps: BackendCapabilities, stats: Option<ProfileStats>) -> Candidate {
    Candidate {
        backend_id: id.to_string(),
        capabilities: caps,
        stats,
    }
}

fn stats(success_rate: f64, mean_latency_ms: f64, usage_count: u64) -> Option<ProfileStats> {
    Some(ProfileStats {
        success_rate,
        mean_latency_ms,
        usage_count,
    })
}

#[test]
fn cold_start_picks_lexicographically_first() {
    let f = fixture();
    f.registry.register("s3", BackendCapabilities::default()).unwrap();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();

    let decision = f
        .engine
        .select_backend(&request("req-1").with_candidates(["ipfs", "s3"]))
        .unwrap();

    assert_eq!(decision.backend_id, "ipfs");
    assert_eq!(decision.alternatives.len(), 2);
    for alternative in &decision.alternatives {
        assert_eq!(alternative.factor(Factor::SuccessRate), Some(0.5));
    }
    assert_eq!(decision.alternatives[1].backend_id, "s3");
}

#[test]
fn learning_prefers_reliable_fast_backend() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();
    f.registry.register("s3", BackendCapabilities::default()).unwrap();

    for _ in 0..10 {
        record(&f.recorder, "ipfs", true, 50.0);
        record(&f.recorder, "s3", false, 500.0);
    }

    let decision = f
        .engine
        .select_backend(&request("req-2").with_candidates(["ipfs", "s3"]))
        .unwrap();

    assert_eq!(decision.backend_id, "ipfs");
    let ipfs = &decision.alternatives[0];
    let s3 = &decision.alternatives[1];
    assert!(ipfs.score > s3.score);
    assert_eq!(ipfs.factor(Factor::Latency), Some(1.0));
    assert_eq!(s3.factor(Factor::Latency), Some(0.0));
}

#[test]
fn single_candidate_is_always_selected() {
    let f = fixture();
    f.registry.register("arweave", BackendCapabilities::default()).unwrap();
    record(&f.recorder, "arweave", false, 900.0);

    let decision = f
        .engine
        .select_backend(&request("req-3").with_candidates(["arweave"]))
        .unwrap();
    assert_eq!(decision.backend_id, "arweave");
    assert!(decision.score.is_finite());
    assert_eq!(decision.chosen().factor(Factor::Latency), Some(1.0));
}

#[test]
fn empty_candidate_list_uses_all_registered() {
    let f = fixture();
    f.registry.register("a", BackendCapabilities::default()).unwrap();
    f.registry.register("b", BackendCapabilities::default()).unwrap();

    let decision = f.engine.select_backend(&request("req-4")).unwrap();
    assert_eq!(decision.alternatives.len(), 2);
}

#[test]
fn no_registered_backends_is_an_error() {
    let f = fixture();
    let err = f.engine.select_backend(&request("req-5")).unwrap_err();
    assert_eq!(err.kind(), "no_available_backends");

    let err = f
        .engine
        .select_backend(&request("req-6").with_candidates(["ghost"]))
        .unwrap_err();
    assert!(matches!(err, RoutingError::NoAvailableBackends { requested } if requested == vec!["ghost"]));
}

#[test]
fn invalid_request_has_no_side_effects() {
    let f = fixture();
    f.registry.register("ipfs", BackendCapabilities::default()).unwrap();

    let err = f.engine.select_backend(&request("")).unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
    assert_eq!(f.recorder.profile_count(), 0);
}

#[test]
fn selection_is_deterministic_without_new_outcomes() {
    let f = fixture();
    for id in ["ipfs", "s3", "storj"] {
        f.registry.register(id, BackendCapabilities::default()).unwrap();
    }
    record(&f.recorder, "s3", true, 120.0);
    record(&f.recorder, "storj", true, 80.0);

    let first = f.engine.select_backend(&request("a")).unwrap();
    let second = f.engine.select_backend(&request("b")).unwrap();
    assert_eq!(first.alternatives, second.alternatives);
}

#[test]
fn geo_factor_excluded_without_client_location() {
    let caps = BackendCapabilities {
        region: Some("eu-west".to_string()),
        ..Default::default()
    };
    let ranked = rank(
        &[candidate("ipfs", caps, None)],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        None,
    );
    assert_eq!(ranked[0].factor(Factor::GeoProximity), None);
    assert_eq!(ranked[0].factors.len(), Factor::COUNT - 1);
}

#[test]
fn geo_factor_prefers_nearby_backend() {
    let near = BackendCapabilities {
        region: Some("eu-west".to_string()),
        ..Default::default()
    };
    let far = BackendCapabilities {
        region: Some("ap-southeast".to_string()),
        ..Default::default()
    };
    let client = crate::registry::region::centroid("eu-central");
    let ranked = rank(
        &[candidate("far", far, None), candidate("near", near, None)],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        client,
    );
    assert_eq!(ranked[0].backend_id, "near");
    let near_geo = ranked[0].factor(Factor::GeoProximity).unwrap();
    let far_geo = ranked[1].factor(Factor::GeoProximity).unwrap();
    assert!(near_geo > far_geo);
    assert!((0.0..=1.0).contains(&far_geo));
}

#[test]
fn cost_tiers_map_inverse_linearly() {
    let tiered = |tier| BackendCapabilities {
        cost_tier: Some(tier),
        ..Default::default()
    };
    let ranked = rank(
        &[
            candidate("cheap", tiered(1), None),
            candidate("mid", tiered(3), None),
            candidate("pricey", tiered(5), None),
            candidate("unknown", BackendCapabilities::default(), None),
        ],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        None,
    );
    let cost_of = |id: &str| {
        ranked
            .iter()
            .find(|s| s.backend_id == id)
            .and_then(|s| s.factor(Factor::Cost))
            .unwrap()
    };
    assert_eq!(cost_of("cheap"), 1.0);
    assert_eq!(cost_of("mid"), 0.5);
    assert_eq!(cost_of("pricey"), 0.0);
    assert_eq!(cost_of("unknown"), 0.5);
    assert_eq!(ranked[0].backend_id, "cheap");
}

#[test]
fn unobserved_latency_is_neutral() {
    let ranked = rank(
        &[
            candidate("seen", BackendCapabilities::default(), stats(0.9, 100.0, 5)),
            candidate("fresh", BackendCapabilities::default(), None),
        ],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        None,
    );
    let fresh = ranked.iter().find(|s| s.backend_id == "fresh").unwrap();
    let seen = ranked.iter().find(|s| s.backend_id == "seen").unwrap();
    assert_eq!(fresh.factor(Factor::Latency), Some(0.5));
    assert_eq!(seen.factor(Factor::Latency), Some(1.0));
}

#[test]
fn cost_strategy_changes_ranking() {
    let fast_pricey = candidate(
        "fast",
        BackendCapabilities {
            cost_tier: Some(5),
            ..Default::default()
        },
        stats(0.9, 20.0, 10),
    );
    let slow_cheap = candidate(
        "slow",
        BackendCapabilities {
            cost_tier: Some(1),
            ..Default::default()
        },
        stats(0.9, 400.0, 10),
    );
    let candidates = [fast_pricey, slow_cheap];
    let weights = FactorWeights::uniform();

    let perf = rank(&candidates, &weights, Strategy::Performance, Priority::Normal, None);
    let cost = rank(&candidates, &weights, Strategy::Cost, Priority::Normal, None);

    assert_eq!(perf[0].backend_id, "fast");
    assert_eq!(cost[0].backend_id, "slow");
}

#[test]
fn tie_break_prefers_lower_usage() {
    let ranked = rank(
        &[
            candidate("a", BackendCapabilities::default(), stats(0.5, 100.0, 9)),
            candidate("b", BackendCapabilities::default(), stats(0.5, 100.0, 2)),
        ],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        None,
    );
    assert_eq!(ranked[0].backend_id, "b");
}

#[test]
fn all_zero_custom_multipliers_fall_back_to_learned_weights() {
    let metadata: BTreeMap<String, String> = Factor::ALL
        .iter()
        .map(|f| (format!("strategy.{}", f.as_str()), "0".to_string()))
        .collect();
    let strategy = Strategy::parse("custom", &metadata).unwrap();
    let ranked = rank(
        &[candidate("x", BackendCapabilities::default(), None)],
        &FactorWeights::default(),
        strategy,
        Priority::Normal,
        None,
    );
    assert!((ranked[0].score - 0.5).abs() < 1e-12);
}

#[test]
fn priority_amplifies_success_factor() {
    let candidates = [
        candidate("reliable", BackendCapabilities::default(), stats(0.99, 300.0, 20)),
        candidate("quick", BackendCapabilities::default(), stats(0.60, 50.0, 20)),
    ];
    let weights = FactorWeights::default();
    let low = rank(&candidates, &weights, Strategy::Balanced, Priority::Low, None);
    let critical = rank(&candidates, &weights, Strategy::Balanced, Priority::Critical, None);

    let gap = |ranked: &[BackendScore]| {
        let score = |id: &str| ranked.iter().find(|s| s.backend_id == id).unwrap().score;
        score("reliable") - score("quick")
    };
    assert!(gap(&critical) > gap(&low));
}

#[test]
fn snapshot_carries_included_factors() {
    let ranked = rank(
        &[candidate("ipfs", BackendCapabilities::default(), stats(0.9, 10.0, 3))],
        &FactorWeights::default(),
        Strategy::Balanced,
        Priority::Normal,
        None,
    );
    let snapshot = ranked[0].snapshot();
    assert_eq!(snapshot.backend_id, "ipfs");
    assert!(!snapshot.factor_scores.contains_key(&Factor::GeoProximity));
    assert_eq!(
        snapshot.contributions(),
        vec![(Factor::SuccessRate, Stance::For), (Factor::Latency, Stance::For)]
    );
}

fn arb_candidate() -> impl proptest::strategy::Strategy<Value = (Option<u8>, Option<f64>, Option<(f64, f64, u64)>)> {
    (
        proptest::option::of(1u8..=5),
        proptest::option::of(0.0f64..=1.0),
        proptest::option::of((0.0f64..=1.0, 0.0f64..5000.0, 0u64..50)),
    )
}

proptest! {
    /// Output is a descending permutation of the candidates with bounded scores.
    #[test]
    fn prop_ranking_is_descending_permutation(
        specs in proptest::collection::vec(arb_candidate(), 1..12),
    ) {
        let candidates: Vec<Candidate> = specs
            .iter()
            .enumerate()
            .map(|(i, (tier, capacity, observed))| Candidate {
                backend_id: format!("backend-{:02}", i),
                capabilities: BackendCapabilities {
                    cost_tier: *tier,
                    capacity_ratio: *capacity,
                    ..Default::default()
                },
                stats: observed.map(|(success_rate, mean_latency_ms, usage_count)| ProfileStats {
                    success_rate,
                    mean_latency_ms,
                    usage_count,
                }),
            })
            .collect();

        let ranked = rank(
            &candidates,
            &FactorWeights::default(),
            Strategy::Balanced,
            Priority::Normal,
            None,
        );

        prop_assert_eq!(ranked.len(), candidates.len());
        let mut ids: Vec<&str> = ranked.iter().map(|s| s.backend_id.as_str()).collect();
        ids.sort();
        let mut expected: Vec<&str> = candidates.iter().map(|c| c.backend_id.as_str()).collect();
        expected.sort();
        prop_assert_eq!(ids, expected);

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score - TIE_EPSILON);
        }
        for score in &ranked {
            prop_assert!((0.0..=1.0).contains(&score.score));
            for factor in &score.factors {
                prop_assert!((0.0..=1.0).contains(&factor.value));
            }
        }
    }
}
