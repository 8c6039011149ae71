//! Statically configured backends

use crate::registry::BackendCapabilities;
use serde::{Deserialize, Serialize};

/// A backend registered at startup.
///
/// ```toml
/// [[backends]]
/// id = "s3"
/// kind = "object_store"
/// region = "us-east-1"
/// cost_tier = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    #[serde(flatten)]
    pub capabilities: BackendCapabilities,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BackendKind;

    #[test]
    fn capabilities_are_flattened() {
        let toml = r#"
            id = "arweave"
            kind = "decentralized"
            region = "eu-central"
            cost_tier = 4
            capacity_ratio = 0.6
        "#;
        let backend: BackendConfig = toml::from_str(toml).unwrap();
        assert_eq!(backend.id, "arweave");
        assert_eq!(backend.capabilities.kind, BackendKind::Decentralized);
        assert_eq!(backend.capabilities.cost_tier, Some(4));
        assert_eq!(backend.capabilities.capacity_ratio, Some(0.6));
    }

    #[test]
    fn capabilities_default_when_omitted() {
        let backend: BackendConfig = toml::from_str(r#"id = "ipfs""#).unwrap();
        assert_eq!(backend.capabilities, BackendCapabilities::default());
    }
}
