//! Domain <-> Protobuf Conversions
//!
//! Sensors and locations convert infallibly in both directions. Messages that
//! carry timestamps fail with `InvalidArgument` when a wire timestamp falls
//! outside the range `chrono` can represent.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tonic::Status;

use super::proto::sensorsphere::v1 as proto;
use crate::domain::{GetSensorRequest, Location, Sensor, SensorReading, TimeRangeQuery};

// =============================================================================
// Timestamps
// =============================================================================

/// Convert a UTC time to a protobuf timestamp.
#[must_use]
pub fn to_timestamp(time: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: time.timestamp(),
        nanos: i32::try_from(time.timestamp_subsec_nanos()).unwrap_or(i32::MAX),
    }
}

/// Convert a protobuf timestamp to a UTC time.
pub fn from_timestamp(ts: &Timestamp) -> Result<DateTime<Utc>, Status> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
        .ok_or_else(|| {
            Status::invalid_argument(format!(
                "timestamp out of range: {}s {}ns",
                ts.seconds, ts.nanos
            ))
        })
}

fn from_optional_timestamp(ts: Option<&Timestamp>) -> Result<Option<DateTime<Utc>>, Status> {
    ts.map(from_timestamp).transpose()
}

// =============================================================================
// Sensors
// =============================================================================

impl From<Location> for proto::Location {
    fn from(location: Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

impl From<proto::Location> for Location {
    fn from(location: proto::Location) -> Self {
        Self::new(location.latitude, location.longitude)
    }
}

impl From<Sensor> for proto::Sensor {
    fn from(sensor: Sensor) -> Self {
        Self {
            name: sensor.name,
            location: Some(sensor.location.into()),
            tags: sensor.tags.unwrap_or_default(),
        }
    }
}

/// Repeated fields are always present on the wire, so tags decode to `Some`.
impl From<proto::Sensor> for Sensor {
    fn from(sensor: proto::Sensor) -> Self {
        Self {
            name: sensor.name,
            location: sensor.location.map(Location::from).unwrap_or_default(),
            tags: Some(sensor.tags),
        }
    }
}

impl From<proto::GetSensorRequest> for GetSensorRequest {
    fn from(request: proto::GetSensorRequest) -> Self {
        Self::new(request.name)
    }
}

// =============================================================================
// Readings
// =============================================================================

impl From<SensorReading> for proto::SensorReading {
    fn from(reading: SensorReading) -> Self {
        Self {
            sensor_name: reading.sensor_name,
            time: reading.time.map(to_timestamp),
            value: reading.value,
        }
    }
}

impl TryFrom<proto::SensorReading> for SensorReading {
    type Error = Status;

    fn try_from(reading: proto::SensorReading) -> Result<Self, Self::Error> {
        Ok(Self {
            sensor_name: reading.sensor_name,
            time: from_optional_timestamp(reading.time.as_ref())?,
            value: reading.value,
        })
    }
}

impl From<TimeRangeQuery> for proto::TimeRangeQuery {
    fn from(query: TimeRangeQuery) -> Self {
        Self {
            sensor_name: query.sensor_name,
            start_time: query.start_time.map(to_timestamp),
            end_time: query.end_time.map(to_timestamp),
        }
    }
}

impl TryFrom<proto::TimeRangeQuery> for TimeRangeQuery {
    type Error = Status;

    fn try_from(query: proto::TimeRangeQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            sensor_name: query.sensor_name,
            start_time: from_optional_timestamp(query.start_time.as_ref())?,
            end_time: from_optional_timestamp(query.end_time.as_ref())?,
        })
    }
}
