//! Routing strategies and request priorities

use crate::weights::Factor;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metadata key prefix for custom strategy multipliers, e.g. `strategy.cost`.
pub const CUSTOM_MULTIPLIER_PREFIX: &str = "strategy.";

/// Per-factor multipliers of a custom strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorMultipliers([f64; Factor::COUNT]);

impl FactorMultipliers {
    pub fn neutral() -> Self {
        Self([1.0; Factor::COUNT])
    }

    /// Read `strategy.<factor>` keys from request metadata.
    ///
    /// Missing or unparseable entries stay at 1.0; negatives clamp to 0.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Self {
        let mut values = [1.0; Factor::COUNT];
        for (key, raw) in metadata {
            let Some(name) = key.strip_prefix(CUSTOM_MULTIPLIER_PREFIX) else {
                continue;
            };
            let Ok(factor) = name.parse::<Factor>() else {
                continue;
            };
            if let Ok(value) = raw.trim().parse::<f64>() {
                if value.is_finite() {
                    values[factor.index()] = value.max(0.0);
                }
            }
        }
        Self(values)
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.0[factor.index()]
    }
}

/// Routing strategy: a fixed set of multipliers applied on top of the
/// learned weights at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Strategy {
    /// Favor speed and reliability
    Performance,
    /// Favor cheap backends
    Cost,
    /// Learned weights as they are
    #[default]
    Balanced,
    /// Caller-supplied multipliers
    Custom(FactorMultipliers),
}

impl Strategy {
    /// Parse a strategy tag; `custom` reads its multipliers from `metadata`.
    pub fn parse(tag: &str, metadata: &BTreeMap<String, String>) -> Result<Self, String> {
        match tag.trim().to_lowercase().as_str() {
            "custom" => Ok(Strategy::Custom(FactorMultipliers::from_metadata(metadata))),
            other => other.parse(),
        }
    }

    pub fn multiplier(&self, factor: Factor) -> f64 {
        match self {
            Strategy::Performance => match factor {
                Factor::Latency => 2.0,
                Factor::SuccessRate => 1.5,
                Factor::Cost => 0.5,
                _ => 1.0,
            },
            Strategy::Cost => match factor {
                Factor::Cost => 2.5,
                Factor::Latency => 0.5,
                Factor::Capacity => 0.75,
                _ => 1.0,
            },
            Strategy::Balanced => 1.0,
            Strategy::Custom(multipliers) => multipliers.get(factor),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Performance => "performance",
            Strategy::Cost => "cost",
            Strategy::Balanced => "balanced",
            Strategy::Custom(_) => "custom",
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    /// Parses the named strategies; `custom` yields neutral multipliers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "performance" => Ok(Strategy::Performance),
            "cost" => Ok(Strategy::Cost),
            "balanced" => Ok(Strategy::Balanced),
            "custom" => Ok(Strategy::Custom(FactorMultipliers::neutral())),
            _ => Err(format!("Unknown routing strategy: {}", s)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request priority; scales how much reliability matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Multiplier applied to the success-rate weight.
    pub fn success_multiplier(self) -> f64 {
        match self {
            Priority::Low => 0.8,
            Priority::Normal => 1.0,
            Priority::High => 1.25,
            Priority::Critical => 1.5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
