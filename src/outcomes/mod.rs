//! Outcome recording.
//!
//! Ingests post-operation outcomes and keeps rolling per-backend statistics
//! (exponential moving averages plus a small bounded ring of recent samples).
//!
//! Each backend has its own lock, so concurrent writers reporting on
//! different backends never contend with one another.

mod profile;

pub use profile::*;

use crate::config::OutcomesConfig;
use crate::registry::{Registry, RegistryError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of recording one outcome.
#[derive(Debug, Clone)]
pub struct RecordReceipt {
    /// The backend was unknown and has been registered lazily
    pub lazily_registered: bool,
    /// Profile state right after the update
    pub profile: BackendProfile,
}

/// Exclusive owner of [`BackendProfile`] mutation.
pub struct OutcomeRecorder {
    registry: Arc<Registry>,
    profiles: DashMap<String, Arc<Mutex<ProfileState>>>,
    config: OutcomesConfig,
}

impl OutcomeRecorder {
    pub fn new(registry: Arc<Registry>, config: OutcomesConfig) -> Self {
        Self {
            registry,
            profiles: DashMap::new(),
            config,
        }
    }

    /// Record one outcome.
    ///
    /// Outcomes for unregistered backends are not rejected: the backend is
    /// registered lazily so real telemetry is never thrown away.
    pub fn record_outcome(&self, outcome: &Outcome) -> Result<RecordReceipt, RegistryError> {
        let lazily_registered = self.registry.ensure_registered(&outcome.backend_id)?;
        if lazily_registered {
            tracing::info!(
                backend_id = %outcome.backend_id,
                "Outcome reported for unknown backend, registered lazily"
            );
        }

        // Clone the slot out so the map shard is released before we lock.
        let slot = self
            .profiles
            .entry(outcome.backend_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ProfileState::new(
                    &outcome.backend_id,
                    outcome.timestamp,
                    self.config.sample_capacity,
                    self.config.max_content_types,
                )))
            })
            .clone();

        let profile = {
            let mut state = lock_state(&slot, &outcome.backend_id);
            state.record(outcome, self.config.smoothing_factor);
            state.profile.clone()
        };

        let status = if outcome.success { "success" } else { "failure" };
        metrics::counter!("conduit_outcomes_total",
            "backend" => outcome.backend_id.clone(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("conduit_outcome_duration_seconds",
            "backend" => outcome.backend_id.clone()
        )
        .record(outcome.duration_ms.max(0.0) / 1000.0);

        tracing::debug!(
            backend_id = %outcome.backend_id,
            success = outcome.success,
            duration_ms = outcome.duration_ms,
            success_rate = profile.success_rate,
            mean_latency_ms = profile.mean_latency_ms,
            "Recorded outcome"
        );

        Ok(RecordReceipt {
            lazily_registered,
            profile,
        })
    }

    /// Snapshot of a backend's profile (a copy, never a live reference).
    pub fn get_profile(&self, backend_id: &str) -> Option<BackendProfile> {
        let slot = self.slot(backend_id)?;
        let state = lock_state(&slot, backend_id);
        Some(state.profile.clone())
    }

    /// Scoring-relevant statistics without copying the content-type tallies.
    pub fn stats(&self, backend_id: &str) -> Option<ProfileStats> {
        let slot = self.slot(backend_id)?;
        let state = lock_state(&slot, backend_id);
        Some(state.profile.stats())
    }

    /// Number of recorded outcomes for a backend (0 if none).
    pub fn usage_count(&self, backend_id: &str) -> u64 {
        self.stats(backend_id).map_or(0, |s| s.usage_count)
    }

    /// Snapshots of every profile, ordered by backend id.
    pub fn profiles(&self) -> Vec<BackendProfile> {
        let mut profiles: Vec<BackendProfile> = self
            .slots()
            .into_iter()
            .map(|(id, slot)| lock_state(&slot, &id).profile.clone())
            .collect();
        profiles.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        profiles
    }

    /// Retained samples for a backend at or after `since` (all if `None`).
    pub fn samples(&self, backend_id: &str, since: Option<DateTime<Utc>>) -> Vec<OutcomeSample> {
        let Some(slot) = self.slot(backend_id) else {
            return Vec::new();
        };
        let state = lock_state(&slot, backend_id);
        state
            .samples
            .iter()
            .filter(|s| since.map_or(true, |cutoff| s.timestamp >= cutoff))
            .cloned()
            .collect()
    }

    /// Ids of every backend with at least one recorded outcome, sorted.
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn config(&self) -> &OutcomesConfig {
        &self.config
    }

    fn slot(&self, backend_id: &str) -> Option<Arc<Mutex<ProfileState>>> {
        self.profiles.get(backend_id).map(|entry| Arc::clone(entry.value()))
    }

    fn slots(&self) -> Vec<(String, Arc<Mutex<ProfileState>>)> {
        self.profiles
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

fn lock_state<'a>(slot: &'a Mutex<ProfileState>, backend_id: &str) -> MutexGuard<'a, ProfileState> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(backend_id, "Profile lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
