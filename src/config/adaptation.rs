//! Factor weight adaptation configuration

use crate::weights::{AdaptationSettings, Factor, FactorWeights, WeightError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Learning-rule tunables and the starting weight vector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub learning_rate: f64,
    pub baseline: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Starting weights by factor name; normalized on load.
    /// Empty means the built-in defaults.
    pub initial_weights: BTreeMap<String, f64>,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        let settings = AdaptationSettings::default();
        Self {
            learning_rate: settings.learning_rate,
            baseline: settings.baseline,
            min_weight: settings.min_weight,
            max_weight: settings.max_weight,
            initial_weights: BTreeMap::new(),
        }
    }
}

impl AdaptationConfig {
    pub fn settings(&self) -> AdaptationSettings {
        AdaptationSettings {
            learning_rate: self.learning_rate,
            baseline: self.baseline,
            min_weight: self.min_weight,
            max_weight: self.max_weight,
        }
    }

    /// Parse `initial_weights` into a normalized vector.
    pub fn initial_weights(&self) -> Result<FactorWeights, WeightError> {
        if self.initial_weights.is_empty() {
            return Ok(FactorWeights::default());
        }
        let pairs = self
            .initial_weights
            .iter()
            .map(|(name, weight)| {
                name.parse::<Factor>()
                    .map(|factor| (factor, *weight))
                    .map_err(|_| WeightError::UnknownFactor(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        FactorWeights::from_pairs(pairs)
    }
}
