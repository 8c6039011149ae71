//! Per-backend rolling statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Success-rate prior used before a backend has any history.
pub const NEUTRAL_SUCCESS_RATE: f64 = 0.5;

/// Tally key for content types seen after a backend's cap is reached.
pub const OVERFLOW_CONTENT_TYPE: &str = "other";

/// A post-operation report from a storage driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub backend_id: String,
    pub success: bool,
    pub duration_ms: f64,
    pub content_type: String,
    pub content_size: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome counts for one content type on one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeTally {
    pub count: u64,
    pub successes: u64,
    pub bytes: u64,
}

impl ContentTypeTally {
    pub fn success_ratio(&self) -> Option<f64> {
        (self.count > 0).then(|| self.successes as f64 / self.count as f64)
    }
}

/// One retained outcome, kept in a bounded ring per backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSample {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: f64,
    pub content_type: String,
}

/// Point-in-time copy of a backend's rolling statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub backend_id: String,
    /// EMA of success (1.0) / failure (0.0)
    pub success_rate: f64,
    /// EMA of operation duration in milliseconds
    pub mean_latency_ms: f64,
    pub usage_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_error: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub content_types: BTreeMap<String, ContentTypeTally>,
}

/// The scoring-relevant subset of a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileStats {
    pub success_rate: f64,
    pub mean_latency_ms: f64,
    pub usage_count: u64,
}

impl BackendProfile {
    pub(crate) fn empty(backend_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            success_rate: NEUTRAL_SUCCESS_RATE,
            mean_latency_ms: 0.0,
            usage_count: 0,
            success_count: 0,
            failure_count: 0,
            last_error: None,
            last_updated: now,
            content_types: BTreeMap::new(),
        }
    }

    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            success_rate: self.success_rate,
            mean_latency_ms: self.mean_latency_ms,
            usage_count: self.usage_count,
        }
    }

    /// Fold one outcome into the moving averages.
    ///
    /// At most `max_content_types` distinct types get their own tally; new
    /// types past that point are counted under [`OVERFLOW_CONTENT_TYPE`].
    pub(crate) fn apply(&mut self, outcome: &Outcome, alpha: f64, max_content_types: usize) {
        let success = if outcome.success { 1.0 } else { 0.0 };
        let duration = outcome.duration_ms.max(0.0);

        self.success_rate = alpha * success + (1.0 - alpha) * self.success_rate;
        // first sample seeds the mean instead of being dragged toward zero
        self.mean_latency_ms = if self.usage_count == 0 {
            duration
        } else {
            alpha * duration + (1.0 - alpha) * self.mean_latency_ms
        };

        self.usage_count += 1;
        if outcome.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
            self.last_error = outcome.error.clone();
        }
        if outcome.timestamp > self.last_updated || self.usage_count == 1 {
            self.last_updated = outcome.timestamp;
        }

        let key = if self.content_types.contains_key(&outcome.content_type)
            || self.named_content_types() < max_content_types
        {
            outcome.content_type.as_str()
        } else {
            OVERFLOW_CONTENT_TYPE
        };
        let tally = self.content_types.entry(key.to_string()).or_default();
        tally.count += 1;
        tally.bytes = tally.bytes.saturating_add(outcome.content_size);
        if outcome.success {
            tally.successes += 1;
        }
    }

    fn named_content_types(&self) -> usize {
        let overflow = self.content_types.contains_key(OVERFLOW_CONTENT_TYPE);
        self.content_types.len() - usize::from(overflow)
    }
}

/// Mutable state guarded by one per-backend lock.
#[derive(Debug)]
pub(crate) struct ProfileState {
    pub profile: BackendProfile,
    pub samples: VecDeque<OutcomeSample>,
    capacity: usize,
    max_content_types: usize,
}

impl ProfileState {
    pub fn new(
        backend_id: &str,
        now: DateTime<Utc>,
        capacity: usize,
        max_content_types: usize,
    ) -> Self {
        Self {
            profile: BackendProfile::empty(backend_id, now),
            samples: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            max_content_types,
        }
    }

    pub fn record(&mut self, outcome: &Outcome, alpha: f64) {
        self.profile.apply(outcome, alpha, self.max_content_types);

        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(OutcomeSample {
            timestamp: outcome.timestamp,
            success: outcome.success,
            duration_ms: outcome.duration_ms.max(0.0),
            content_type: outcome.content_type.clone(),
        });
    }
}
