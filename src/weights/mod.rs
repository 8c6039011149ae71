//! Factor weight adaptation.
//!
//! The learned [`FactorWeights`] vector is shared by every scoring call and
//! rewritten after every outcome. It lives behind an atomically swapped
//! pointer: the single writer builds a complete new vector and publishes it
//! in one store, so readers never observe a half-updated vector and never
//! take a lock.
//!
//! Each update is a pure function of the current vector, the
//! [`DecisionSnapshot`] that justified the selection, and the success flag:
//!
//! ```text
//! w_f' = w_f * (1 + s_f * lr * (reward - baseline))   for each contributing factor
//! ```
//!
//! where `s_f` is +1 for a factor that scored the chosen backend above
//! neutral and -1 for one that scored it below. A failure therefore shifts
//! weight from the factors that recommended the backend to those that
//! warned against it.
//!
//! followed by clamping to `[min_weight, max_weight]` and renormalization to
//! 1.0, solved together so both invariants hold after every publish.

mod error;
mod factor;
mod snapshot;

pub use error::WeightError;
pub use factor::{Factor, FactorWeights};
pub use snapshot::{DecisionSnapshot, Stance, NEUTRAL_FACTOR_SCORE};

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Tunables of the adaptation rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptationSettings {
    pub learning_rate: f64,
    pub baseline: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for AdaptationSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            baseline: 0.5,
            min_weight: 0.01,
            max_weight: 0.90,
        }
    }
}

impl AdaptationSettings {
    pub fn validate(&self) -> Result<(), WeightError> {
        if !(self.learning_rate > 0.0 && self.learning_rate < 1.0) {
            return Err(WeightError::InvalidLearningRate(self.learning_rate));
        }
        if !(0.0..=1.0).contains(&self.baseline) {
            return Err(WeightError::InvalidBaseline(self.baseline));
        }

        let count = Factor::COUNT as f64;
        let bounds_ok = self.min_weight >= 0.0
            && self.min_weight < self.max_weight
            && self.max_weight <= 1.0
            && self.min_weight * count <= 1.0
            && self.max_weight * count >= 1.0;
        if !bounds_ok {
            return Err(WeightError::InfeasibleBounds {
                min: self.min_weight,
                max: self.max_weight,
                count: Factor::COUNT,
            });
        }
        Ok(())
    }
}

/// Owner of the shared, learned factor weights.
pub struct FactorWeightAdapter {
    current: ArcSwap<FactorWeights>,
    /// Serializes writers; readers go through `current` only
    writer: Mutex<()>,
    settings: AdaptationSettings,
    initial: FactorWeights,
    updates: AtomicU64,
}

impl FactorWeightAdapter {
    /// Create an adapter starting from `initial`, projected into the bounds.
    pub fn new(settings: AdaptationSettings, initial: FactorWeights) -> Result<Self, WeightError> {
        settings.validate()?;
        let in_bounds = (initial.sum() - 1.0).abs() < 1e-12
            && initial
                .iter()
                .all(|(_, w)| w >= settings.min_weight && w <= settings.max_weight);
        let initial = if in_bounds {
            initial
        } else {
            FactorWeights::from_raw(rebalance(
                initial.raw(),
                settings.min_weight,
                settings.max_weight,
            ))
        };

        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
            settings,
            initial,
            updates: AtomicU64::new(0),
        })
    }

    /// Current weights. Lock-free; the returned vector never changes.
    pub fn snapshot(&self) -> Arc<FactorWeights> {
        self.current.load_full()
    }

    pub fn settings(&self) -> &AdaptationSettings {
        &self.settings
    }

    /// Number of updates that changed the published vector.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Apply one (snapshot, outcome) pair and publish the result.
    ///
    /// Returns the vector in effect after the call. Snapshots whose factors
    /// all sit at neutral leave the weights untouched.
    pub fn update(&self, snapshot: &DecisionSnapshot, success: bool) -> Arc<FactorWeights> {
        let contributing = snapshot.contributions();

        let _guard = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Weight writer lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        let current = self.current.load_full();
        if contributing.is_empty() {
            return current;
        }

        let next = Arc::new(adapt(&current, &contributing, success, &self.settings));
        self.current.store(Arc::clone(&next));
        self.updates.fetch_add(1, Ordering::Relaxed);

        for (factor, weight) in next.iter() {
            metrics::gauge!("conduit_factor_weight", "factor" => factor.as_str()).set(weight);
        }
        tracing::debug!(
            backend_id = %snapshot.backend_id,
            success,
            contributing = ?contributing,
            "Adapted factor weights"
        );

        next
    }

    /// Drop everything learned and go back to the initial vector.
    pub fn reset(&self) {
        let _guard = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.current.store(Arc::new(self.initial));
        tracing::info!("Factor weights reset to initial values");
    }
}

/// One adaptation step. Pure: same inputs, same output.
pub fn adapt(
    weights: &FactorWeights,
    contributing: &[(Factor, Stance)],
    success: bool,
    settings: &AdaptationSettings,
) -> FactorWeights {
    let reward = if success { 1.0 } else { 0.0 };
    let signal = settings.learning_rate * (reward - settings.baseline);

    let mut values = weights.raw();
    for (factor, stance) in contributing {
        values[factor.index()] *= 1.0 + stance.sign() * signal;
    }

    FactorWeights::from_raw(rebalance(values, settings.min_weight, settings.max_weight))
}

/// Clamp every value into `[min, max]` and renormalize to 1.0 at once.
///
/// Clamping then dividing by the sum can push a value back out of bounds,
/// so instead find the common scale `λ` with `Σ clamp(λ·vᵢ, min, max) = 1`
/// by bisection. The sum is monotone in `λ` and spans `[n·min, n·max]`,
/// which contains 1.0 for validated bounds.
fn rebalance(values: [f64; Factor::COUNT], min: f64, max: f64) -> [f64; Factor::COUNT] {
    let floor = min.max(f64::MIN_POSITIVE);
    let values = values.map(|v| if v.is_finite() { v.max(floor) } else { floor });
    let total_at = |lambda: f64| -> f64 {
        values
            .iter()
            .map(|v| (lambda * v).clamp(min, max))
            .sum()
    };

    let smallest = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut lo = 0.0;
    let mut hi = max / smallest;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if total_at(mid) < 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let mut out = values.map(|v| (hi * v).clamp(min, max));

    // Spread the last rounding residue over entries not pinned to a bound.
    let residual = 1.0 - out.iter().sum::<f64>();
    let free: Vec<usize> = (0..out.len())
        .filter(|&i| out[i] > min && out[i] < max)
        .collect();
    if !free.is_empty() {
        let share = residual / free.len() as f64;
        for i in free {
            out[i] = (out[i] + share).clamp(min, max);
        }
    }
    out
}
