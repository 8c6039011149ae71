use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::region::{self, GeoPoint};

/// Highest (most expensive) declared cost tier. Tier 1 is the cheapest.
pub const MAX_COST_TIER: u8 = 5;

/// Storage family a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Content-addressed store (IPFS and friends)
    ContentAddressed,
    /// S3-compatible object store
    ObjectStore,
    /// Decentralized storage network (Filecoin, Arweave, Storj, ...)
    Decentralized,
    /// Anything else, including lazily discovered backends
    #[default]
    Generic,
}

/// How the backend entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationSource {
    /// Registered explicitly by an operator or configuration loader
    Manual,
    /// Created on first reported outcome for an unknown id
    Lazy,
}

/// Static, declared capabilities of a backend.
///
/// Every field is optional; missing signals degrade to neutral or excluded
/// scoring factors rather than failing selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCapabilities {
    pub kind: BackendKind,
    /// Region name, resolved to a centroid for proximity scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Explicit coordinates; take precedence over the region centroid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Declared cost tier, 1 (cheapest) to 5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_tier: Option<u8>,
    /// Fraction of capacity still available, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_ratio: Option<f64>,
}

impl BackendCapabilities {
    /// Coordinates used for proximity scoring, if any can be determined.
    pub fn resolved_location(&self) -> Option<GeoPoint> {
        self.location
            .filter(GeoPoint::is_valid)
            .or_else(|| self.region.as_deref().and_then(region::centroid))
    }

    /// Check declared values are within their documented ranges.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(tier) = self.cost_tier {
            if !(1..=MAX_COST_TIER).contains(&tier) {
                return Err(format!(
                    "cost_tier must be between 1 and {}, got {}",
                    MAX_COST_TIER, tier
                ));
            }
        }
        if let Some(ratio) = self.capacity_ratio {
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
                return Err(format!(
                    "capacity_ratio must be between 0.0 and 1.0, got {}",
                    ratio
                ));
            }
        }
        if let Some(location) = &self.location {
            if !location.is_valid() {
                return Err(format!(
                    "location ({}, {}) is out of range",
                    location.latitude, location.longitude
                ));
            }
        }
        Ok(())
    }
}

/// A storage backend known to the registry.
///
/// # Examples
///
/// ```
/// use conduit::registry::{Backend, BackendCapabilities, RegistrationSource};
///
/// let backend = Backend::new("ipfs", BackendCapabilities::default(), RegistrationSource::Manual);
/// assert_eq!(backend.id, "ipfs");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    pub id: String,
    pub capabilities: BackendCapabilities,
    pub source: RegistrationSource,
    pub registered_at: DateTime<Utc>,
}

impl Backend {
    pub fn new(
        id: impl Into<String>,
        capabilities: BackendCapabilities,
        source: RegistrationSource,
    ) -> Self {
        Self {
            id: id.into(),
            capabilities,
            source,
            registered_at: Utc::now(),
        }
    }

    /// A backend with no declared capabilities, created from telemetry alone.
    pub fn lazy(id: impl Into<String>) -> Self {
        Self::new(id, BackendCapabilities::default(), RegistrationSource::Lazy)
    }
}
