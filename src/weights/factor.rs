//! Scoring factors and the normalized weight vector over them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::WeightError;

/// A named, normalized [0, 1] signal used to score a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Rolling success rate of recorded outcomes
    SuccessRate,
    /// Inverse observed latency, min-max normalized over the candidates
    Latency,
    /// Proximity between client and backend region
    GeoProximity,
    /// Inverse declared cost tier
    Cost,
    /// Declared available capacity
    Capacity,
}

impl Factor {
    pub const COUNT: usize = 5;

    pub const ALL: [Factor; Factor::COUNT] = [
        Factor::SuccessRate,
        Factor::Latency,
        Factor::GeoProximity,
        Factor::Cost,
        Factor::Capacity,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Factor::SuccessRate => 0,
            Factor::Latency => 1,
            Factor::GeoProximity => 2,
            Factor::Cost => 3,
            Factor::Capacity => 4,
        }
    }

    /// Wire name of the factor.
    pub fn as_str(self) -> &'static str {
        match self {
            Factor::SuccessRate => "success_rate",
            Factor::Latency => "latency",
            Factor::GeoProximity => "geo_proximity",
            Factor::Cost => "cost",
            Factor::Capacity => "capacity",
        }
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success_rate" | "success" => Ok(Factor::SuccessRate),
            "latency" => Ok(Factor::Latency),
            "geo_proximity" | "geo" => Ok(Factor::GeoProximity),
            "cost" => Ok(Factor::Cost),
            "capacity" => Ok(Factor::Capacity),
            _ => Err(format!("Unknown factor: {}", s)),
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized weights over all factors.
///
/// Always sums to 1.0 (within floating-point epsilon). Instances are
/// immutable once built; the adapter publishes whole new vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Factor, f64>",
    into = "BTreeMap<Factor, f64>"
)]
pub struct FactorWeights {
    values: [f64; Factor::COUNT],
}

impl FactorWeights {
    /// Equal weight for every factor.
    pub fn uniform() -> Self {
        Self {
            values: [1.0 / Factor::COUNT as f64; Factor::COUNT],
        }
    }

    /// Build from (factor, weight) pairs and normalize to sum 1.0.
    ///
    /// Factors that are not mentioned get weight 0.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Factor, f64)>,
    ) -> Result<Self, WeightError> {
        let mut values = [0.0; Factor::COUNT];
        for (factor, weight) in pairs {
            if !weight.is_finite() || weight < 0.0 {
                return Err(WeightError::InvalidWeight { factor, weight });
            }
            values[factor.index()] = weight;
        }
        Self::normalized(values)
    }

    pub(crate) fn normalized(values: [f64; Factor::COUNT]) -> Result<Self, WeightError> {
        let total: f64 = values.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(WeightError::ZeroTotal);
        }
        let mut values = values;
        for value in values.iter_mut() {
            *value /= total;
        }
        Ok(Self { values })
    }

    pub(crate) fn from_raw(values: [f64; Factor::COUNT]) -> Self {
        Self { values }
    }

    pub(crate) fn raw(&self) -> [f64; Factor::COUNT] {
        self.values
    }

    /// Weight of a single factor.
    pub fn get(&self, factor: Factor) -> f64 {
        self.values[factor.index()]
    }

    /// Sum of all weights (1.0 for every published vector).
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterate (factor, weight) in factor order.
    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Wire representation keyed by factor name.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(factor, weight)| (factor.as_str().to_string(), weight))
            .collect()
    }
}

impl Default for FactorWeights {
    /// Starting point before any learning: reliability first, then speed.
    fn default() -> Self {
        Self {
            values: [0.35, 0.25, 0.15, 0.15, 0.10],
        }
    }
}

impl TryFrom<BTreeMap<Factor, f64>> for FactorWeights {
    type Error = WeightError;

    fn try_from(map: BTreeMap<Factor, f64>) -> Result<Self, Self::Error> {
        Self::from_pairs(map)
    }
}

impl From<FactorWeights> for BTreeMap<Factor, f64> {
    fn from(weights: FactorWeights) -> Self {
        weights.iter().collect()
    }
}
