//! Router façade.
//!
//! Validates request shape, then orchestrates the registry, scoring engine,
//! outcome recorder, weight adapter, insights and streaming. Constructed
//! once and shared by `Arc`; there is no global state.

mod decisions;
pub mod wire;

pub use wire::*;

use crate::config::{ConduitConfig, ConfigError};
use crate::insights::{InsightsAggregator, InsightsFilter, InsightsSnapshot};
use crate::outcomes::{Outcome, OutcomeRecorder};
use crate::registry::{Backend, BackendCapabilities, Registry};
use crate::scoring::{
    ContentDescriptor, Priority, RoutingError, RoutingRequest, ScoringEngine, Strategy,
};
use crate::streaming::{MetricsStreamer, MetricsSubscription, StreamRequest};
use crate::weights::{DecisionSnapshot, Factor, FactorWeightAdapter};
use chrono::Utc;
use decisions::{DecisionLog, OutcomeDeduplicator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct RouterService {
    registry: Arc<Registry>,
    recorder: Arc<OutcomeRecorder>,
    weights: Arc<FactorWeightAdapter>,
    engine: Arc<ScoringEngine>,
    insights: Arc<InsightsAggregator>,
    streamer: MetricsStreamer,
    decisions: DecisionLog,
    dedup: OutcomeDeduplicator,
}

impl RouterService {
    /// Wire every component from configuration.
    ///
    /// `shutdown` ends all metrics subscriptions when cancelled.
    pub fn new(config: &ConduitConfig, shutdown: CancellationToken) -> Result<Self, ConfigError> {
        config.validate()?;

        let initial = config
            .adaptation
            .initial_weights()
            .map_err(|e| ConfigError::invalid("adaptation.initial_weights", e.to_string()))?;
        let weights = Arc::new(
            FactorWeightAdapter::new(config.adaptation.settings(), initial)
                .map_err(|e| ConfigError::invalid("adaptation", e.to_string()))?,
        );

        let registry = Arc::new(Registry::new());
        for backend in &config.backends {
            registry
                .upsert(&backend.id, backend.capabilities.clone())
                .map_err(|e| ConfigError::invalid("backends", e.to_string()))?;
            tracing::info!(
                backend_id = %backend.id.trim(),
                kind = ?backend.capabilities.kind,
                "Loaded backend from config"
            );
        }
        metrics::gauge!("conduit_backends_total").set(registry.backend_count() as f64);

        let recorder = Arc::new(OutcomeRecorder::new(
            Arc::clone(&registry),
            config.outcomes.clone(),
        ));
        let engine = Arc::new(ScoringEngine::new(
            Arc::clone(&registry),
            Arc::clone(&recorder),
            Arc::clone(&weights),
        ));
        let insights = Arc::new(InsightsAggregator::new(
            Arc::clone(&registry),
            Arc::clone(&recorder),
            Arc::clone(&weights),
            Arc::clone(&engine),
        ));
        let streamer = MetricsStreamer::new(
            Arc::clone(&insights),
            config.streaming.clone(),
            shutdown,
        );

        for (factor, weight) in weights.snapshot().iter() {
            metrics::gauge!("conduit_factor_weight", "factor" => factor.as_str()).set(weight);
        }

        Ok(Self {
            registry,
            recorder,
            weights,
            engine,
            insights,
            streamer,
            decisions: DecisionLog::new(config.service.decision_log_capacity),
            dedup: OutcomeDeduplicator::new(Duration::from_secs(
                config.service.dedup_window_seconds,
            )),
        })
    }

    /// Choose a backend for one unit of content.
    pub fn select_backend(
        &self,
        request: SelectBackendRequest,
    ) -> Result<SelectBackendResponse, RoutingError> {
        if request.content_size < 0 {
            return Err(RoutingError::invalid(
                "content_size",
                format!("must be >= 0, got {}", request.content_size),
            ));
        }
        let strategy = Strategy::parse(&request.strategy, &request.metadata)
            .map_err(|e| RoutingError::invalid("strategy", e))?;
        let priority: Priority = request
            .priority
            .parse()
            .map_err(|e: String| RoutingError::invalid("priority", e))?;

        let request_id = request
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let routing = RoutingRequest {
            content: ContentDescriptor {
                content_hash: request.content_hash,
                content_type: request.content_type,
                content_size: request.content_size as u64,
                metadata: request.metadata,
                client_location: request.client_location,
            },
            strategy,
            priority,
            candidates: request.available_backends,
            request_id,
            timestamp: request.timestamp.unwrap_or_else(Utc::now),
        };

        let decision = self.engine.select_backend(&routing)?;
        let chosen = decision.chosen();
        self.decisions.record(&decision.request_id, chosen.snapshot());

        Ok(SelectBackendResponse {
            backend_id: decision.backend_id.clone(),
            score: decision.score,
            factor_scores: chosen
                .factors
                .iter()
                .map(|f| (f.factor.as_str().to_string(), f.value))
                .collect(),
            alternatives: decision
                .alternatives
                .iter()
                .map(|alt| AlternativeScore {
                    backend_id: alt.backend_id.clone(),
                    score: alt.score,
                })
                .collect(),
            request_id: decision.request_id.clone(),
            timestamp: decision.timestamp,
        })
    }

    /// Ingest an operation outcome and adapt the factor weights.
    pub fn record_outcome(
        &self,
        request: RecordOutcomeRequest,
    ) -> Result<RecordOutcomeResponse, RoutingError> {
        let explicit = validate_outcome(&request)?;

        let request_id = request.request_id.as_deref().filter(|id| !id.trim().is_empty());
        if let Some(id) = request_id {
            if self.dedup.is_duplicate(id) {
                tracing::debug!(request_id = %id, "Duplicate outcome ignored");
                return Ok(RecordOutcomeResponse {
                    success: true,
                    message: "Duplicate outcome ignored".to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        let outcome = Outcome {
            backend_id: request.backend_id.trim().to_string(),
            success: request.success,
            duration_ms: request.duration_ms,
            content_type: request.content_type,
            content_size: request.content_size as u64,
            error: request.error,
            timestamp: request.timestamp.unwrap_or_else(Utc::now),
        };
        let receipt = self.recorder.record_outcome(&outcome)?;
        if receipt.lazily_registered {
            metrics::gauge!("conduit_backends_total").set(self.registry.backend_count() as f64);
        }

        let snapshot = match explicit {
            Some(scores) => Some(DecisionSnapshot::new(outcome.backend_id.clone(), scores)),
            None => self.decisions.lookup(request_id, &outcome.backend_id),
        };
        match snapshot {
            Some(snapshot) => {
                self.weights.update(&snapshot, outcome.success);
            }
            None => tracing::debug!(
                backend_id = %outcome.backend_id,
                "No decision snapshot for outcome, weights unchanged"
            ),
        }

        let message = if receipt.lazily_registered {
            format!(
                "Outcome recorded; backend '{}' registered lazily",
                outcome.backend_id
            )
        } else {
            "Outcome recorded".to_string()
        };
        Ok(RecordOutcomeResponse {
            success: true,
            message,
            timestamp: Utc::now(),
        })
    }

    pub fn get_insights(&self, filter: &InsightsFilter) -> Result<InsightsSnapshot, RoutingError> {
        if filter.time_window_hours == Some(0) {
            return Err(RoutingError::invalid(
                "time_window_hours",
                "must be greater than 0",
            ));
        }
        if filter
            .backend_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            return Err(RoutingError::invalid("backend_id", "must not be empty"));
        }
        Ok(self.insights.get_insights(filter))
    }

    /// Start a periodic metrics subscription.
    pub fn stream_metrics(&self, request: StreamRequest) -> Result<MetricsSubscription, RoutingError> {
        self.streamer.subscribe(request)
    }

    pub fn register_backend(
        &self,
        backend_id: &str,
        capabilities: BackendCapabilities,
    ) -> Result<Backend, RoutingError> {
        self.registry.register(backend_id, capabilities)?;
        metrics::gauge!("conduit_backends_total").set(self.registry.backend_count() as f64);
        self.registry
            .get(backend_id.trim())
            .ok_or_else(|| RoutingError::BackendNotFound(backend_id.to_string()))
    }

    /// Remove a backend. Its profile is kept.
    pub fn deregister_backend(&self, backend_id: &str) -> Result<Backend, RoutingError> {
        let backend = self.registry.deregister(backend_id)?;
        metrics::gauge!("conduit_backends_total").set(self.registry.backend_count() as f64);
        Ok(backend)
    }

    pub fn list_backends(&self) -> Vec<Backend> {
        self.registry.all()
    }

    pub fn active_streams(&self) -> usize {
        self.streamer.active_subscriptions()
    }

    /// End every metrics subscription with a shutdown notice.
    pub fn shutdown(&self) {
        tracing::info!(
            active_streams = self.streamer.active_subscriptions(),
            "Closing metrics subscriptions"
        );
        self.streamer.shutdown();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.streamer.is_shut_down()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn recorder(&self) -> &Arc<OutcomeRecorder> {
        &self.recorder
    }

    pub fn weights(&self) -> &Arc<FactorWeightAdapter> {
        &self.weights
    }
}

/// Shape checks for an outcome; returns parsed explicit factor scores.
fn validate_outcome(
    request: &RecordOutcomeRequest,
) -> Result<Option<BTreeMap<Factor, f64>>, RoutingError> {
    if request.backend_id.trim().is_empty() {
        return Err(RoutingError::invalid("backend_id", "must not be empty"));
    }
    if !request.duration_ms.is_finite() || request.duration_ms < 0.0 {
        return Err(RoutingError::invalid(
            "duration_ms",
            format!("must be a finite number >= 0, got {}", request.duration_ms),
        ));
    }
    if request.content_size < 0 {
        return Err(RoutingError::invalid(
            "content_size",
            format!("must be >= 0, got {}", request.content_size),
        ));
    }

    let Some(scores) = &request.factor_scores else {
        return Ok(None);
    };
    let mut parsed = BTreeMap::new();
    for (name, value) in scores {
        let factor: Factor = name
            .parse()
            .map_err(|e: String| RoutingError::invalid("factor_scores", e))?;
        if !value.is_finite() || !(0.0..=1.0).contains(value) {
            return Err(RoutingError::invalid(
                "factor_scores",
                format!("score for '{}' must be in [0, 1], got {}", name, value),
            ));
        }
        parsed.insert(factor, *value);
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests;
