//! On-demand introspection snapshots.
//!
//! Nothing here is cached or mutated: every snapshot is assembled from the
//! registry, the outcome recorder and the current weight vector at call time.

mod types;

pub use types::*;

use crate::outcomes::{BackendProfile, OutcomeRecorder, OutcomeSample};
use crate::registry::Registry;
use crate::scoring::{BackendScore, Priority, ScoringEngine, Strategy};
use crate::weights::FactorWeightAdapter;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which parts of a snapshot to compute. Skipped parts are left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub weights: bool,
    pub success_rates: bool,
    pub content_types: bool,
    pub usage: bool,
    pub latency: bool,
    pub scores: bool,
}

impl Sections {
    pub const ALL: Sections = Sections {
        weights: true,
        success_rates: true,
        content_types: true,
        usage: true,
        latency: true,
        scores: true,
    };

    pub const NONE: Sections = Sections {
        weights: false,
        success_rates: false,
        content_types: false,
        usage: false,
        latency: false,
        scores: false,
    };
}

/// Per-backend inputs gathered once per snapshot.
struct BackendView {
    id: String,
    profile: Option<BackendProfile>,
    samples: Vec<OutcomeSample>,
}

pub struct InsightsAggregator {
    registry: Arc<Registry>,
    recorder: Arc<OutcomeRecorder>,
    weights: Arc<FactorWeightAdapter>,
    engine: Arc<ScoringEngine>,
}

impl InsightsAggregator {
    pub fn new(
        registry: Arc<Registry>,
        recorder: Arc<OutcomeRecorder>,
        weights: Arc<FactorWeightAdapter>,
        engine: Arc<ScoringEngine>,
    ) -> Self {
        Self {
            registry,
            recorder,
            weights,
            engine,
        }
    }

    /// Full snapshot narrowed by `filter`.
    pub fn get_insights(&self, filter: &InsightsFilter) -> InsightsSnapshot {
        self.collect(filter, Sections::ALL)
    }

    /// Snapshot with only the requested sections computed.
    pub fn collect(&self, filter: &InsightsFilter, sections: Sections) -> InsightsSnapshot {
        self.collect_scoped(filter, &[], sections)
    }

    /// Like [`collect`](Self::collect), additionally limited to the backends
    /// in `scope` (no limit if empty).
    pub fn collect_scoped(
        &self,
        filter: &InsightsFilter,
        scope: &[String],
        sections: Sections,
    ) -> InsightsSnapshot {
        let now = Utc::now();
        let since = filter.time_window_hours.map(|hours| window_start(now, hours));
        let content_type = filter.content_type.as_deref();

        let views = self.backend_views(filter, scope, since, sections);

        let factor_weights = if sections.weights {
            self.weights.snapshot().to_map()
        } else {
            BTreeMap::new()
        };

        let mut backend_success_rates = BTreeMap::new();
        if sections.success_rates {
            for view in &views {
                if let Some(rate) = success_rate(view, content_type, since.is_some()) {
                    backend_success_rates.insert(view.id.clone(), rate);
                }
            }
        }

        let mut content_type_distribution = BTreeMap::new();
        if sections.content_types {
            for view in &views {
                if since.is_some() {
                    for sample in &view.samples {
                        *content_type_distribution
                            .entry(sample.content_type.clone())
                            .or_insert(0u64) += 1;
                    }
                } else if let Some(profile) = &view.profile {
                    for (kind, tally) in &profile.content_types {
                        if content_type.map_or(true, |wanted| wanted == kind) {
                            *content_type_distribution.entry(kind.clone()).or_insert(0u64) +=
                                tally.count;
                        }
                    }
                }
            }
        }

        let mut backend_usage_stats = BTreeMap::new();
        if sections.usage {
            for view in &views {
                let Some(profile) = &view.profile else {
                    continue;
                };
                backend_usage_stats.insert(
                    view.id.clone(),
                    UsageStats {
                        usage_count: profile.usage_count,
                        success_count: profile.success_count,
                        failure_count: profile.failure_count,
                        mean_latency_ms: profile.mean_latency_ms,
                        last_error: profile.last_error.clone(),
                        source: self.registry.get(&view.id).map(|b| b.source),
                        last_updated: profile.last_updated,
                    },
                );
            }
        }

        let latency_stats = if sections.latency {
            LatencyStats::from_samples(
                views
                    .iter()
                    .flat_map(|view| view.samples.iter().map(|s| s.duration_ms))
                    .collect(),
            )
        } else {
            LatencyStats::default()
        };

        let backend_scores = if sections.scores {
            self.scores(&views)
        } else {
            Vec::new()
        };

        InsightsSnapshot {
            factor_weights,
            backend_scores,
            backend_success_rates,
            content_type_distribution,
            backend_usage_stats,
            latency_stats,
            timestamp: now,
        }
    }

    /// Usage-weighted mean success rate over `backends` (all if empty).
    ///
    /// `None` when none of them has any recorded outcome.
    pub fn aggregate_success_rate(&self, backends: &[String]) -> Option<f64> {
        let profiles = self.recorder.profiles();
        let (weighted, total) = profiles
            .iter()
            .filter(|p| backends.is_empty() || backends.contains(&p.backend_id))
            .fold((0.0, 0u64), |(weighted, total), p| {
                (
                    weighted + p.success_rate * p.usage_count as f64,
                    total + p.usage_count,
                )
            });
        (total > 0).then(|| weighted / total as f64)
    }

    fn backend_views(
        &self,
        filter: &InsightsFilter,
        scope: &[String],
        since: Option<DateTime<Utc>>,
        sections: Sections,
    ) -> Vec<BackendView> {
        let mut ids: Vec<String> = self
            .registry
            .all()
            .into_iter()
            .map(|backend| backend.id)
            .chain(self.recorder.backend_ids())
            .collect();
        ids.sort();
        ids.dedup();
        if let Some(wanted) = &filter.backend_id {
            ids.retain(|id| id == wanted);
        }
        if !scope.is_empty() {
            ids.retain(|id| scope.contains(id));
        }

        let needs_samples = sections.latency
            || (since.is_some() && (sections.success_rates || sections.content_types));
        let content_type = filter.content_type.as_deref();

        ids.into_iter()
            .filter_map(|id| {
                let profile = self.recorder.get_profile(&id);
                if let Some(wanted) = content_type {
                    let has_history = profile
                        .as_ref()
                        .and_then(|p| p.content_types.get(wanted))
                        .is_some_and(|tally| tally.count > 0);
                    if !has_history {
                        return None;
                    }
                }

                let samples = if needs_samples {
                    self.recorder
                        .samples(&id, since)
                        .into_iter()
                        .filter(|s| content_type.map_or(true, |wanted| s.content_type == wanted))
                        .collect()
                } else {
                    Vec::new()
                };

                Some(BackendView {
                    id,
                    profile,
                    samples,
                })
            })
            .collect()
    }

    fn scores(&self, views: &[BackendView]) -> Vec<BackendScore> {
        let registered: Vec<String> = views
            .iter()
            .filter(|view| self.registry.contains(&view.id))
            .map(|view| view.id.clone())
            .collect();
        // an empty candidate list means "everything" to the engine
        if registered.is_empty() {
            return Vec::new();
        }
        self.engine
            .score_all(&registered, Strategy::Balanced, Priority::Normal, None)
            .unwrap_or_default()
    }
}

fn success_rate(view: &BackendView, content_type: Option<&str>, windowed: bool) -> Option<f64> {
    if windowed {
        if view.samples.is_empty() {
            return None;
        }
        let successes = view.samples.iter().filter(|s| s.success).count();
        return Some(successes as f64 / view.samples.len() as f64);
    }

    let profile = view.profile.as_ref()?;
    match content_type {
        Some(wanted) => profile.content_types.get(wanted)?.success_ratio(),
        None => (profile.usage_count > 0).then_some(profile.success_rate),
    }
}

/// Start of a window reaching `hours` back from `now`. Windows older than
/// the representable range start at the earliest instant.
fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests;
