use super::*;
use crate::registry::RegistrationSource;

fn service() -> RouterService {
    RouterService::new(&ConduitConfig::default(), CancellationToken::new()).unwrap()
}

fn cheap() -> BackendCapabilities {
    BackendCapabilities {
        cost_tier: Some(1),
        ..Default::default()
    }
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = ConduitConfig::default();
    config.adaptation.learning_rate = 1.5;
    let err = RouterService::new(&config, CancellationToken::new()).err().unwrap();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn select_generates_request_id_and_lists_alternatives() {
    let service = service();
    service.register_backend("ipfs", BackendCapabilities::default()).unwrap();
    service.register_backend("s3", cheap()).unwrap();

    let response = service
        .select_backend(SelectBackendRequest::new("image/png", 1024))
        .unwrap();
    assert_eq!(response.backend_id, "s3");
    assert!(!response.request_id.is_empty());
    assert_eq!(response.alternatives.len(), 2);
    assert_eq!(response.alternatives[0].backend_id, response.backend_id);
    assert_eq!(response.factor_scores["cost"], 1.0);
    assert!(!response.factor_scores.contains_key("geo_proximity"));
}

#[test]
fn select_keeps_caller_request_id() {
    let service = service();
    service.register_backend("ipfs", BackendCapabilities::default()).unwrap();

    let mut request = SelectBackendRequest::new("image/png", 1);
    request.request_id = Some("req-7".to_string());
    let response = service.select_backend(request).unwrap();
    assert_eq!(response.request_id, "req-7");
}

#[test]
fn negative_size_is_invalid() {
    let service = service();
    service.register_backend("ipfs", BackendCapabilities::default()).unwrap();

    let err = service
        .select_backend(SelectBackendRequest::new("image/png", -1))
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
    assert!(err.to_string().contains("content_size"));
}

#[test]
fn unknown_strategy_and_priority_are_invalid() {
    let service = service();
    service.register_backend("ipfs", BackendCapabilities::default()).unwrap();

    let mut request = SelectBackendRequest::new("image/png", 1);
    request.strategy = "fastest".to_string();
    assert_eq!(
        service.select_backend(request).unwrap_err().kind(),
        "invalid_request"
    );

    let mut request = SelectBackendRequest::new("image/png", 1);
    request.priority = "urgent".to_string();
    assert_eq!(
        service.select_backend(request).unwrap_err().kind(),
        "invalid_request"
    );
}

#[test]
fn select_without_backends_fails() {
    let service = service();
    let err = service
        .select_backend(SelectBackendRequest::new("image/png", 1))
        .unwrap_err();
    assert_eq!(err.kind(), "no_available_backends");
}

#[test]
fn outcome_for_unknown_backend_registers_it_lazily() {
    let service = service();
    let response = service
        .record_outcome(RecordOutcomeRequest::new("ghost_backend", true, 40.0))
        .unwrap();

    assert!(response.success);
    assert!(response.message.contains("lazily"));
    let backend = service.registry().get("ghost_backend").unwrap();
    assert_eq!(backend.source, RegistrationSource::Lazy);
    assert_eq!(service.recorder().usage_count("ghost_backend"), 1);

    // second outcome is an ordinary one
    let response = service
        .record_outcome(RecordOutcomeRequest::new("ghost_backend", true, 40.0))
        .unwrap();
    assert_eq!(response.message, "Outcome recorded");
}

#[test]
fn duplicate_outcome_is_ignored() {
    let service = service();
    let mut request = RecordOutcomeRequest::new("ipfs", true, 12.0);
    request.request_id = Some("req-1".to_string());

    service.record_outcome(request.clone()).unwrap();
    let response = service.record_outcome(request).unwrap();

    assert!(response.success);
    assert!(response.message.contains("Duplicate"));
    assert_eq!(service.recorder().usage_count("ipfs"), 1);
}

#[test]
fn outcome_validation() {
    let service = service();

    let blank = RecordOutcomeRequest::new("  ", true, 1.0);
    assert_eq!(service.record_outcome(blank).unwrap_err().kind(), "invalid_request");

    let nan = RecordOutcomeRequest::new("ipfs", true, f64::NAN);
    assert_eq!(service.record_outcome(nan).unwrap_err().kind(), "invalid_request");

    let negative = RecordOutcomeRequest::new("ipfs", true, -5.0);
    assert_eq!(
        service.record_outcome(negative).unwrap_err().kind(),
        "invalid_request"
    );

    let mut unknown_factor = RecordOutcomeRequest::new("ipfs", true, 1.0);
    unknown_factor.factor_scores = Some(BTreeMap::from([("speed".to_string(), 0.9)]));
    assert_eq!(
        service.record_outcome(unknown_factor).unwrap_err().kind(),
        "invalid_request"
    );

    let mut out_of_range = RecordOutcomeRequest::new("ipfs", true, 1.0);
    out_of_range.factor_scores = Some(BTreeMap::from([("latency".to_string(), 1.5)]));
    assert_eq!(
        service.record_outcome(out_of_range).unwrap_err().kind(),
        "invalid_request"
    );

    // nothing was recorded
    assert_eq!(service.recorder().profile_count(), 0);
}

#[test]
fn explicit_factor_scores_move_weights() {
    let service = service();
    let before = service.weights().snapshot().get(Factor::Latency);

    let mut request = RecordOutcomeRequest::new("ipfs", true, 10.0);
    request.factor_scores = Some(BTreeMap::from([
        ("latency".to_string(), 0.9),
        ("cost".to_string(), 0.2),
    ]));
    service.record_outcome(request).unwrap();

    let after = service.weights().snapshot();
    assert!(after.get(Factor::Latency) > before);
    assert!((after.sum() - 1.0).abs() < 1e-9);
    assert_eq!(service.weights().update_count(), 1);
}

#[test]
fn outcome_pairs_with_logged_selection() {
    let service = service();
    service.register_backend("s3", cheap()).unwrap();

    let mut select = SelectBackendRequest::new("video/mp4", 1 << 20);
    select.request_id = Some("req-9".to_string());
    let decision = service.select_backend(select).unwrap();
    assert_eq!(decision.backend_id, "s3");

    let before = service.weights().snapshot().get(Factor::Cost);
    let mut outcome = RecordOutcomeRequest::new("s3", true, 80.0);
    outcome.request_id = Some("req-9".to_string());
    service.record_outcome(outcome).unwrap();

    assert!(service.weights().snapshot().get(Factor::Cost) > before);
}

#[test]
fn outcome_without_snapshot_leaves_weights() {
    let service = service();
    let before = service.weights().snapshot();

    service
        .record_outcome(RecordOutcomeRequest::new("ipfs", false, 10.0))
        .unwrap();

    assert_eq!(*service.weights().snapshot(), *before);
    assert_eq!(service.weights().update_count(), 0);
}

#[test]
fn failure_teaches_factors_that_argued_against() {
    let service = service();
    let before = service.weights().snapshot();

    let mut outcome = RecordOutcomeRequest::new("s3", false, 400.0);
    outcome.factor_scores = Some(BTreeMap::from([
        ("success_rate".to_string(), 0.3),
        ("latency".to_string(), 0.0),
        ("cost".to_string(), 0.5),
        ("capacity".to_string(), 0.5),
    ]));
    service.record_outcome(outcome).unwrap();

    let after = service.weights().snapshot();
    assert_eq!(service.weights().update_count(), 1);
    assert!(after.get(Factor::SuccessRate) > before.get(Factor::SuccessRate));
    assert!(after.get(Factor::Latency) > before.get(Factor::Latency));
}

#[test]
fn insights_filter_validation() {
    let service = service();
    let zero_window = InsightsFilter {
        time_window_hours: Some(0),
        ..Default::default()
    };
    assert_eq!(
        service.get_insights(&zero_window).unwrap_err().kind(),
        "invalid_request"
    );

    let blank_backend = InsightsFilter::for_backend(" ");
    assert_eq!(
        service.get_insights(&blank_backend).unwrap_err().kind(),
        "invalid_request"
    );

    assert!(service.get_insights(&InsightsFilter::default()).is_ok());
}

#[test]
fn widest_time_window_covers_all_history() {
    let service = service();
    service
        .record_outcome(RecordOutcomeRequest::new("ipfs", true, 10.0))
        .unwrap();

    let filter = InsightsFilter {
        time_window_hours: Some(u32::MAX),
        ..Default::default()
    };
    let insights = service.get_insights(&filter).unwrap();
    assert_eq!(insights.backend_success_rates["ipfs"], 1.0);
}

#[test]
fn backend_management_errors() {
    let service = service();
    service.register_backend("ipfs", BackendCapabilities::default()).unwrap();

    let err = service
        .register_backend("ipfs", BackendCapabilities::default())
        .unwrap_err();
    assert_eq!(err.kind(), "duplicate_backend");

    let err = service.deregister_backend("arweave").unwrap_err();
    assert_eq!(err.kind(), "backend_not_found");

    let removed = service.deregister_backend("ipfs").unwrap();
    assert_eq!(removed.id, "ipfs");
    assert!(service.list_backends().is_empty());
}

#[test]
fn configured_backends_are_registered() {
    let mut config = ConduitConfig::default();
    config.backends = vec![
        crate::config::BackendConfig {
            id: "ipfs".to_string(),
            capabilities: BackendCapabilities::default(),
        },
        crate::config::BackendConfig {
            id: "s3".to_string(),
            capabilities: cheap(),
        },
    ];
    let service = RouterService::new(&config, CancellationToken::new()).unwrap();

    let ids: Vec<String> = service.list_backends().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["ipfs", "s3"]);
    assert!(service
        .list_backends()
        .iter()
        .all(|b| b.source == RegistrationSource::Manual));
}
