//! Bounded log of selection snapshots and recently seen outcome ids.

use crate::weights::DecisionSnapshot;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

struct LoggedDecision {
    sequence: u64,
    snapshot: DecisionSnapshot,
}

/// Selection snapshots keyed by request id, plus the latest per backend.
pub(crate) struct DecisionLog {
    by_request: DashMap<String, LoggedDecision>,
    last_by_backend: DashMap<String, DecisionSnapshot>,
    sequence: AtomicU64,
    capacity: usize,
}

impl DecisionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            by_request: DashMap::new(),
            last_by_backend: DashMap::new(),
            sequence: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, request_id: &str, snapshot: DecisionSnapshot) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_by_backend
            .insert(snapshot.backend_id.clone(), snapshot.clone());
        self.by_request
            .insert(request_id.to_string(), LoggedDecision { sequence, snapshot });

        if self.by_request.len() > self.capacity {
            // evict the oldest quarter at once so eviction stays amortized
            let keep = (self.capacity * 3 / 4).max(1) as u64;
            let cutoff = sequence.saturating_sub(keep);
            self.by_request.retain(|_, logged| logged.sequence > cutoff);
        }
    }

    /// The snapshot to pair with an outcome for `backend_id`.
    ///
    /// A logged decision for `request_id` wins if it chose this backend;
    /// otherwise the most recent decision for the backend is used.
    pub fn lookup(&self, request_id: Option<&str>, backend_id: &str) -> Option<DecisionSnapshot> {
        if let Some(id) = request_id {
            if let Some(logged) = self.by_request.get(id) {
                if logged.snapshot.backend_id == backend_id {
                    return Some(logged.snapshot.clone());
                }
            }
        }
        self.last_by_backend
            .get(backend_id)
            .map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_request.len()
    }
}

/// Remembers outcome request ids for a fixed window.
///
/// Expired ids are swept when the map outgrows `prune_at`. After a sweep the
/// limit moves to twice the surviving size, so sweeps stay amortized O(1)
/// per call even when every remembered id is still live.
pub(crate) struct OutcomeDeduplicator {
    seen: DashMap<String, Instant>,
    window: Duration,
    min_prune_at: usize,
    prune_at: AtomicUsize,
    prunes: AtomicU64,
}

impl OutcomeDeduplicator {
    /// Pruning starts once this many ids are remembered.
    const PRUNE_THRESHOLD: usize = 4096;

    pub fn new(window: Duration) -> Self {
        Self::with_prune_threshold(window, Self::PRUNE_THRESHOLD)
    }

    pub fn with_prune_threshold(window: Duration, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            seen: DashMap::new(),
            window,
            min_prune_at: threshold,
            prune_at: AtomicUsize::new(threshold),
            prunes: AtomicU64::new(0),
        }
    }

    /// `true` if `request_id` was already seen inside the window. Otherwise
    /// remembers it and returns `false`.
    pub fn is_duplicate(&self, request_id: &str) -> bool {
        if self.window.is_zero() {
            return false;
        }
        let now = Instant::now();
        let duplicate = match self.seen.entry(request_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.window {
                    true
                } else {
                    entry.insert(now);
                    false
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        };

        if !duplicate {
            self.maybe_prune(now);
        }
        duplicate
    }

    fn maybe_prune(&self, now: Instant) {
        let limit = self.prune_at.load(Ordering::Relaxed);
        if self.seen.len() <= limit {
            return;
        }
        // one caller sweeps; the others see the raised limit and move on
        if self
            .prune_at
            .compare_exchange(limit, usize::MAX, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let window = self.window;
        self.seen
            .retain(|_, seen_at| now.duration_since(*seen_at) < window);
        let remaining = self.seen.len();
        let next = remaining.saturating_mul(2).max(self.min_prune_at);
        self.prune_at.store(next, Ordering::Release);
        self.prunes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(remembered = remaining, next_sweep_at = next, "Pruned outcome ids");
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Sweeps performed so far.
    #[cfg(test)]
    pub fn prune_count(&self) -> u64 {
        self.prunes.load(Ordering::Relaxed)
    }
}
