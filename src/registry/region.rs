//! Geographic helpers: region centroids and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Longest possible surface distance between two points (half the circumference).
pub const MAX_SURFACE_DISTANCE_KM: f64 = std::f64::consts::PI * EARTH_RADIUS_KM;

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the coordinates are finite and inside the valid lat/long ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Haversine distance to another point in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_KM * c
    }

    /// Distance scaled into [0, 1] against the longest surface distance.
    pub fn normalized_distance(&self, other: &GeoPoint) -> f64 {
        (self.distance_km(other) / MAX_SURFACE_DISTANCE_KM).clamp(0.0, 1.0)
    }
}

/// Known region centroids. Names follow the common cloud naming scheme;
/// zone suffixes such as `-1` or `-2a` are stripped before lookup.
const REGION_CENTROIDS: &[(&str, f64, f64)] = &[
    ("us-east", 38.9, -77.4),
    ("us-west", 37.4, -121.9),
    ("us-central", 41.6, -93.6),
    ("ca-central", 45.5, -73.6),
    ("sa-east", -23.5, -46.6),
    ("eu-west", 53.3, -6.3),
    ("eu-central", 50.1, 8.7),
    ("eu-north", 59.3, 18.1),
    ("eu-south", 45.5, 9.2),
    ("uk-south", 51.5, -0.1),
    ("me-central", 25.2, 55.3),
    ("af-south", -33.9, 18.4),
    ("ap-south", 19.1, 72.9),
    ("ap-southeast", 1.3, 103.8),
    ("ap-northeast", 35.7, 139.7),
    ("ap-east", 22.3, 114.2),
    ("au-southeast", -33.9, 151.2),
];

/// Resolve a region name to its centroid.
///
/// Matching is case-insensitive and tolerant of zone suffixes, so
/// `us-east-1`, `US-East` and `us-east-2b` all resolve to `us-east`.
pub fn centroid(region: &str) -> Option<GeoPoint> {
    let normalized = region.trim().to_lowercase().replace('_', "-");
    let base = strip_zone_suffix(&normalized);

    REGION_CENTROIDS
        .iter()
        .find(|(name, _, _)| *name == base)
        .map(|(_, lat, lon)| GeoPoint::new(*lat, *lon))
}

fn strip_zone_suffix(region: &str) -> &str {
    match region.rsplit_once('-') {
        Some((head, tail)) if tail.starts_with(|c: char| c.is_ascii_digit()) => head,
        _ => region,
    }
}
