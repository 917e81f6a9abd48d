//! Shared geographic and time types

use serde::{Deserialize, Serialize};

/// Milliseconds in one minute; drift rates are expressed per minute.
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Mean Earth radius used for local planar projections (km).
const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude (degrees, north positive)
    pub lat: f64,
    /// Longitude (degrees, east positive)
    pub lon: f64,
}

impl GeoPosition {
    /// Creates a new position
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true when both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Projects this position onto a local east/north plane (km) centred on
    /// `origin`, using an equirectangular approximation.
    ///
    /// Racing areas span a few kilometres at most, so the approximation error
    /// stays well below GPS noise.
    pub fn to_local_km(&self, origin: &GeoPosition) -> (f64, f64) {
        let cos_lat = origin.lat.to_radians().cos();
        let east = (self.lon - origin.lon).to_radians() * cos_lat * EARTH_RADIUS_KM;
        let north = (self.lat - origin.lat).to_radians() * EARTH_RADIUS_KM;
        (east, north)
    }

    /// Approximate distance to another position (km)
    pub fn distance_km(&self, other: &GeoPosition) -> f64 {
        let (east, north) = other.to_local_km(self);
        east.hypot(north)
    }
}

/// Signed elapsed time from `from_ms` to `to_ms`, in minutes.
pub fn elapsed_minutes(from_ms: u64, to_ms: u64) -> f64 {
    (to_ms as i64 - from_ms as i64) as f64 / MS_PER_MINUTE
}
