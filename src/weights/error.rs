use super::Factor;
use thiserror::Error;

/// Errors raised while building or configuring factor weights.
#[derive(Debug, Error)]
pub enum WeightError {
    #[error("weight for '{factor}' must be a non-negative finite number, got {weight}")]
    InvalidWeight { factor: Factor, weight: f64 },

    #[error("weights must not all be zero")]
    ZeroTotal,

    #[error(
        "weight bounds [{min}, {max}] cannot hold {count} factors summing to 1.0"
    )]
    InfeasibleBounds { min: f64, max: f64, count: usize },

    #[error("learning rate must be in (0, 1), got {0}")]
    InvalidLearningRate(f64),

    #[error("reward baseline must be in [0, 1], got {0}")]
    InvalidBaseline(f64),

    #[error("unknown factor '{0}'")]
    UnknownFactor(String),
}
