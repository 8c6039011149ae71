//! Routing request types

use super::{Priority, RoutingError, Strategy};
use crate::registry::{region, GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What is being stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    pub content_hash: Option<String>,
    pub content_type: String,
    pub content_size: u64,
    pub metadata: BTreeMap<String, String>,
    pub client_location: Option<ClientLocation>,
}

/// Where the caller is. Coordinates win over the region name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
}

impl ClientLocation {
    pub fn resolve(&self) -> Option<GeoPoint> {
        let explicit = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                Some(GeoPoint::new(latitude, longitude)).filter(GeoPoint::is_valid)
            }
            _ => None,
        };
        explicit.or_else(|| self.region.as_deref().and_then(region::centroid))
    }
}

/// A single selection request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingRequest {
    pub content: ContentDescriptor,
    pub strategy: Strategy,
    pub priority: Priority,
    /// Candidate backend ids; empty means every registered backend
    pub candidates: Vec<String>,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl RoutingRequest {
    pub fn new(request_id: impl Into<String>, content: ContentDescriptor) -> Self {
        Self {
            content,
            strategy: Strategy::default(),
            priority: Priority::default(),
            candidates: Vec::new(),
            request_id: request_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Shape checks that need no backend state.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.request_id.trim().is_empty() {
            return Err(RoutingError::invalid("request_id", "must not be empty"));
        }
        if self.content.content_type.trim().is_empty() {
            return Err(RoutingError::invalid("content_type", "must not be empty"));
        }
        if self.candidates.iter().any(|id| id.trim().is_empty()) {
            return Err(RoutingError::invalid(
                "available_backends",
                "backend ids must not be empty",
            ));
        }
        if let Some(location) = &self.content.client_location {
            if location.latitude.is_some() != location.longitude.is_some() {
                return Err(RoutingError::invalid(
                    "client_location",
                    "latitude and longitude must be given together",
                ));
            }
            if let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) {
                if !GeoPoint::new(latitude, longitude).is_valid() {
                    return Err(RoutingError::invalid(
                        "client_location",
                        "coordinates out of range",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> ContentDescriptor {
        ContentDescriptor {
            content_type: "image/jpeg".to_string(),
            content_size: 2048,
            ..Default::default()
        }
    }

    #[test]
    fn client_location_prefers_coordinates() {
        let location = ClientLocation {
            latitude: Some(10.0),
            longitude: Some(20.0),
            region: Some("eu-west".to_string()),
        };
        assert_eq!(location.resolve(), Some(GeoPoint::new(10.0, 20.0)));
    }

    #[test]
    fn client_location_falls_back_to_region() {
        let location = ClientLocation {
            region: Some("us-east-1".to_string()),
            ..Default::default()
        };
        assert_eq!(location.resolve(), region::centroid("us-east"));
        assert!(ClientLocation::default().resolve().is_none());
    }

    #[test]
    fn validate_accepts_minimal_request() {
        let request = RoutingRequest::new("req-1", content());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let err = RoutingRequest::new("", content()).validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_request");

        let mut descriptor = content();
        descriptor.content_type.clear();
        let err = RoutingRequest::new("req-1", descriptor).validate().unwrap_err();
        assert!(matches!(err, RoutingError::InvalidRequest { field, .. } if field == "content_type"));
    }

    #[test]
    fn validate_rejects_half_coordinates() {
        let mut descriptor = content();
        descriptor.client_location = Some(ClientLocation {
            latitude: Some(1.0),
            ..Default::default()
        });
        assert!(RoutingRequest::new("req-1", descriptor).validate().is_err());
    }

    #[test]
    fn builder_sets_candidates() {
        let request = RoutingRequest::new("req-1", content()).with_candidates(["ipfs", "s3"]);
        assert_eq!(request.candidates, vec!["ipfs", "s3"]);
    }
}
