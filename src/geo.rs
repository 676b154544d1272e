use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres used for great-circle math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average courier speed assumed when estimating arrival times.
pub const AVERAGE_COURIER_SPEED_KMH: f64 = 30.0;

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A single courier position report as carried by the delivery gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationSample {
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl From<Coordinates> for LocationSample {
    fn from(coords: Coordinates) -> Self {
        Self {
            lat: coords.lat,
            lng: coords.lng,
            timestamp: None,
        }
    }
}

/// Great-circle distance between two points in kilometres (haversine formula).
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_phi = (b.lat - a.lat).to_radians();
    let delta_lambda = (b.lng - a.lng).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Estimated minutes until arrival for the remaining distance, rounded up to
/// the next whole minute. Always a rough figure; callers must present it as an
/// estimate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn eta_minutes(distance_km: f64) -> u64 {
    if distance_km <= 0.0 {
        return 0;
    }
    (distance_km / AVERAGE_COURIER_SPEED_KMH * 60.0).ceil() as u64
}
