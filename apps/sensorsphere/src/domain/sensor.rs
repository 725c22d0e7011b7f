//! Sensor Types
//!
//! A sensor is identified by its name and has a fixed location plus a list of
//! free-form tags. Updates replace every field at once.

use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees.
///
/// `0.0` on either axis means "not provided". Operations that need a real
/// position reject it, so the equator and the prime meridian cannot be
/// addressed exactly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Create a location from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates carry a non-zero value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    /// Squared planar distance to another location.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat.mul_add(dlat, dlon * dlon)
    }
}

/// A named sensor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensor {
    /// Unique sensor name.
    pub name: String,
    /// Sensor position.
    pub location: Location,
    /// Tags attached to the sensor. `None` means the field was absent from
    /// the request, which create and update reject. An empty list is valid.
    pub tags: Option<Vec<String>>,
}

impl Sensor {
    /// Create a sensor with the given tags.
    #[must_use]
    pub fn new(name: impl Into<String>, location: Location, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            location,
            tags: Some(tags),
        }
    }
}

/// Lookup key for a single sensor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSensorRequest {
    /// Sensor name.
    pub name: String,
}

impl GetSensorRequest {
    /// Create a lookup for the given sensor name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
