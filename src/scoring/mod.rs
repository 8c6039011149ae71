//! Backend scoring and selection.
//!
//! Every candidate gets a [0, 1] value per [`Factor`]. The aggregate score is
//! the weighted mean of the included factors, where each weight is the
//! learned weight times the strategy multiplier (and, for the success
//! factor, the priority multiplier). Factors with no signal either take the
//! neutral value 0.5 or, for geographic proximity, drop out of the mean.

mod error;
mod request;
mod strategies;

pub use error::RoutingError;
pub use request::{ClientLocation, ContentDescriptor, RoutingRequest};
pub use strategies::{FactorMultipliers, Priority, Strategy, CUSTOM_MULTIPLIER_PREFIX};

use crate::outcomes::{OutcomeRecorder, ProfileStats};
use crate::registry::{BackendCapabilities, GeoPoint, Registry, MAX_COST_TIER};
use crate::weights::{
    DecisionSnapshot, Factor, FactorWeightAdapter, FactorWeights, NEUTRAL_FACTOR_SCORE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scores closer than this are considered tied.
pub const TIE_EPSILON: f64 = 1e-9;

/// One factor's value for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub value: f64,
}

/// A backend's aggregate score with its per-factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendScore {
    pub backend_id: String,
    pub score: f64,
    /// Included factors only, in factor order
    pub factors: Vec<FactorScore>,
}

impl BackendScore {
    pub fn factor(&self, factor: Factor) -> Option<f64> {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map(|f| f.value)
    }

    pub fn factor_map(&self) -> BTreeMap<Factor, f64> {
        self.factors.iter().map(|f| (f.factor, f.value)).collect()
    }

    /// The snapshot to pair with a later outcome for this backend.
    pub fn snapshot(&self) -> DecisionSnapshot {
        DecisionSnapshot::new(self.backend_id.clone(), self.factor_map())
    }
}

/// Result of a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub backend_id: String,
    pub score: f64,
    /// Every candidate, best first; the chosen backend is at index 0
    pub alternatives: Vec<BackendScore>,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl RoutingDecision {
    pub fn chosen(&self) -> &BackendScore {
        &self.alternatives[0]
    }
}

/// Everything scoring needs to know about one candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub backend_id: String,
    pub capabilities: BackendCapabilities,
    pub stats: Option<ProfileStats>,
}

impl Candidate {
    fn usage_count(&self) -> u64 {
        self.stats.map_or(0, |s| s.usage_count)
    }

    fn observed(&self) -> Option<ProfileStats> {
        self.stats.filter(|s| s.usage_count > 0)
    }
}

/// Ranks candidate backends against the current weight snapshot.
pub struct ScoringEngine {
    registry: Arc<Registry>,
    recorder: Arc<OutcomeRecorder>,
    weights: Arc<FactorWeightAdapter>,
}

impl ScoringEngine {
    pub fn new(
        registry: Arc<Registry>,
        recorder: Arc<OutcomeRecorder>,
        weights: Arc<FactorWeightAdapter>,
    ) -> Self {
        Self {
            registry,
            recorder,
            weights,
        }
    }

    /// Pick the best backend for `request`.
    pub fn select_backend(&self, request: &RoutingRequest) -> Result<RoutingDecision, RoutingError> {
        request.validate()?;

        let ids = self.registry.list_available(&request.candidates)?;
        if ids.is_empty() {
            return Err(RoutingError::NoAvailableBackends {
                requested: request.candidates.clone(),
            });
        }

        let client = request
            .content
            .client_location
            .as_ref()
            .and_then(ClientLocation::resolve);
        let ranked = self.score_candidates(&ids, request.strategy, request.priority, client);

        let chosen = &ranked[0];
        metrics::counter!("conduit_selections_total",
            "backend" => chosen.backend_id.clone(),
            "strategy" => request.strategy.name()
        )
        .increment(1);
        tracing::debug!(
            request_id = %request.request_id,
            backend_id = %chosen.backend_id,
            score = chosen.score,
            strategy = %request.strategy,
            priority = %request.priority,
            candidates = ranked.len(),
            "Selected backend"
        );

        Ok(RoutingDecision {
            backend_id: chosen.backend_id.clone(),
            score: chosen.score,
            request_id: request.request_id.clone(),
            timestamp: Utc::now(),
            alternatives: ranked,
        })
    }

    /// Score the given backends (all registered if empty), best first.
    pub fn score_all(
        &self,
        candidates: &[String],
        strategy: Strategy,
        priority: Priority,
        client: Option<GeoPoint>,
    ) -> Result<Vec<BackendScore>, RoutingError> {
        let ids = self.registry.list_available(candidates)?;
        Ok(self.score_candidates(&ids, strategy, priority, client))
    }

    fn score_candidates(
        &self,
        ids: &[String],
        strategy: Strategy,
        priority: Priority,
        client: Option<GeoPoint>,
    ) -> Vec<BackendScore> {
        // one snapshot for the whole ranking
        let weights = self.weights.snapshot();
        let candidates: Vec<Candidate> = ids
            .iter()
            .map(|id| Candidate {
                backend_id: id.clone(),
                capabilities: self.registry.capabilities(id).unwrap_or_default(),
                stats: self.recorder.stats(id),
            })
            .collect();
        rank(&candidates, &weights, strategy, priority, client)
    }
}

/// Score and order candidates. Pure: same inputs, same ranking.
///
/// Ties (scores within [`TIE_EPSILON`]) go to the less used backend, then
/// to the lexicographically smaller id.
pub fn rank(
    candidates: &[Candidate],
    weights: &FactorWeights,
    strategy: Strategy,
    priority: Priority,
    client: Option<GeoPoint>,
) -> Vec<BackendScore> {
    let latency = LatencyRange::over(candidates);

    let mut scored: Vec<(BackendScore, u64)> = candidates
        .iter()
        .map(|candidate| {
            let factors = factor_scores(candidate, &latency, client);
            let score = aggregate(&factors, weights, strategy, priority);
            (
                BackendScore {
                    backend_id: candidate.backend_id.clone(),
                    score,
                    factors,
                },
                candidate.usage_count(),
            )
        })
        .collect();

    scored.sort_by(|(a, usage_a), (b, usage_b)| {
        b.score
            .total_cmp(&a.score)
            .then(usage_a.cmp(usage_b))
            .then_with(|| a.backend_id.cmp(&b.backend_id))
    });

    // Re-order runs of near-equal scores by the tie-break keys. Runs are
    // anchored at their first element so the comparison stays transitive.
    let mut start = 0;
    while start < scored.len() {
        let head = scored[start].0.score;
        let mut end = start + 1;
        while end < scored.len() && (head - scored[end].0.score).abs() < TIE_EPSILON {
            end += 1;
        }
        scored[start..end].sort_by(|(a, usage_a), (b, usage_b)| {
            usage_a
                .cmp(usage_b)
                .then_with(|| a.backend_id.cmp(&b.backend_id))
        });
        start = end;
    }

    scored.into_iter().map(|(score, _)| score).collect()
}

/// Observed latency bounds across candidates.
struct LatencyRange {
    min: f64,
    max: f64,
}

impl LatencyRange {
    fn over(candidates: &[Candidate]) -> Option<Self> {
        candidates
            .iter()
            .filter_map(|c| c.observed().map(|s| s.mean_latency_ms))
            .filter(|latency| latency.is_finite())
            .fold(None, |range: Option<LatencyRange>, latency| {
                Some(match range {
                    None => LatencyRange {
                        min: latency,
                        max: latency,
                    },
                    Some(r) => LatencyRange {
                        min: r.min.min(latency),
                        max: r.max.max(latency),
                    },
                })
            })
    }

    /// Lowest latency maps to 1.0, highest to 0.0.
    fn score(&self, latency: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            1.0
        } else {
            ((self.max - latency) / span).clamp(0.0, 1.0)
        }
    }
}

fn factor_scores(
    candidate: &Candidate,
    latency: &Option<LatencyRange>,
    client: Option<GeoPoint>,
) -> Vec<FactorScore> {
    let observed = candidate.observed();
    let caps = &candidate.capabilities;
    let mut factors = Vec::with_capacity(Factor::COUNT);

    factors.push(FactorScore {
        factor: Factor::SuccessRate,
        value: observed.map_or(NEUTRAL_FACTOR_SCORE, |s| s.success_rate.clamp(0.0, 1.0)),
    });

    let latency_value = match (observed, latency) {
        (Some(stats), Some(range)) if stats.mean_latency_ms.is_finite() => {
            range.score(stats.mean_latency_ms)
        }
        _ => NEUTRAL_FACTOR_SCORE,
    };
    factors.push(FactorScore {
        factor: Factor::Latency,
        value: latency_value,
    });

    if let (Some(client), Some(location)) = (client, caps.resolved_location()) {
        factors.push(FactorScore {
            factor: Factor::GeoProximity,
            value: 1.0 - client.normalized_distance(&location),
        });
    }

    let cost = match caps.cost_tier {
        Some(tier) => {
            let tier = tier.clamp(1, MAX_COST_TIER);
            f64::from(MAX_COST_TIER - tier) / f64::from(MAX_COST_TIER - 1)
        }
        None => NEUTRAL_FACTOR_SCORE,
    };
    factors.push(FactorScore {
        factor: Factor::Cost,
        value: cost,
    });

    factors.push(FactorScore {
        factor: Factor::Capacity,
        value: caps
            .capacity_ratio
            .filter(|r| r.is_finite())
            .map_or(NEUTRAL_FACTOR_SCORE, |r| r.clamp(0.0, 1.0)),
    });

    factors
}

fn aggregate(
    factors: &[FactorScore],
    weights: &FactorWeights,
    strategy: Strategy,
    priority: Priority,
) -> f64 {
    let effective = |factor: Factor| {
        let mut w = weights.get(factor) * strategy.multiplier(factor);
        if factor == Factor::SuccessRate {
            w *= priority.success_multiplier();
        }
        w
    };

    let weighted_mean = |weight_of: &dyn Fn(Factor) -> f64| -> Option<f64> {
        let (num, den) = factors.iter().fold((0.0, 0.0), |(num, den), f| {
            let w = weight_of(f.factor);
            (num + w * f.value, den + w)
        });
        (den > 0.0).then(|| num / den)
    };

    // A custom strategy can zero every included factor; fall back to the
    // learned weights, then to a plain mean.
    weighted_mean(&effective)
        .or_else(|| weighted_mean(&|f| weights.get(f)))
        .unwrap_or_else(|| {
            factors.iter().map(|f| f.value).sum::<f64>() / factors.len().max(1) as f64
        })
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests;
