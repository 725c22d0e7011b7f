//! Domain Layer - Sensor telemetry values.
//!
//! Transport-agnostic types shared by the HTTP and gRPC bindings. The JSON
//! form of every type is its serde representation (camelCase keys, RFC 3339
//! timestamps with nanosecond precision).

/// Sensors and their positions.
pub mod sensor;

/// Sensor readings and time-range queries.
pub mod reading;

mod timestamp;

pub use reading::{SensorReading, TimeRangeQuery};
pub use sensor::{GetSensorRequest, Location, Sensor};
