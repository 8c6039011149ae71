//! The factor-score snapshot that justified a routing decision.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Factor;

/// Factor value that carries no evidence either way.
pub const NEUTRAL_FACTOR_SCORE: f64 = 0.5;

/// Which way a factor argued about the chosen backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    /// Scored above neutral
    For,
    /// Scored below neutral
    Against,
}

impl Stance {
    /// Direction of the reward signal applied to the factor's weight.
    pub fn sign(self) -> f64 {
        match self {
            Stance::For => 1.0,
            Stance::Against => -1.0,
        }
    }
}

/// Factor scores of the chosen backend at selection time.
///
/// Outcomes are paired with the snapshot that produced the selection, so
/// adaptation never re-derives "what mattered" from state that has since
/// moved on. Only factors included in the weighted sum appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    pub backend_id: String,
    pub factor_scores: BTreeMap<Factor, f64>,
}

impl DecisionSnapshot {
    pub fn new(backend_id: impl Into<String>, factor_scores: BTreeMap<Factor, f64>) -> Self {
        Self {
            backend_id: backend_id.into(),
            factor_scores,
        }
    }

    /// Every included factor with an opinion, and which way it leaned.
    ///
    /// A factor sitting exactly at neutral carries no evidence and is left out.
    pub fn contributions(&self) -> Vec<(Factor, Stance)> {
        self.factor_scores
            .iter()
            .filter_map(|(factor, value)| {
                if *value > NEUTRAL_FACTOR_SCORE + f64::EPSILON {
                    Some((*factor, Stance::For))
                } else if *value < NEUTRAL_FACTOR_SCORE - f64::EPSILON {
                    Some((*factor, Stance::Against))
                } else {
                    None
                }
            })
            .collect()
    }
}
