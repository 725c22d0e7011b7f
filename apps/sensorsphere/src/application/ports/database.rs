//! Storage port.

use async_trait::async_trait;

use crate::domain::{Location, Sensor, SensorReading, TimeRangeQuery};

/// Errors surfaced by a storage backend.
///
/// Messages reach clients verbatim on both transports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A lookup matched no rows.
    #[error("no rows in result set")]
    NotFound,

    /// A sensor with the same name already exists.
    #[error("duplicate key value violates unique constraint \"sensors_pkey\": {0}")]
    Duplicate(String),

    /// The handle was closed.
    #[error("database is closed")]
    Closed,

    /// Schema migration failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Sensor and reading storage.
///
/// Implementations must be safe for concurrent use; every request handler
/// shares one handle. Dropping a returned future abandons the call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    /// Insert a sensor and return it as stored.
    async fn create_sensor(&self, sensor: &Sensor) -> Result<Sensor, StorageError>;

    /// Fetch a sensor by name.
    async fn get_sensor(&self, name: &str) -> Result<Sensor, StorageError>;

    /// Replace location and tags of the named sensor. Returns rows affected.
    async fn update_sensor(&self, sensor: &Sensor) -> Result<u64, StorageError>;

    /// Return the sensor closest to `location`.
    async fn get_nearest_sensor(&self, location: &Location) -> Result<Sensor, StorageError>;

    /// Store a reading, stamping it with the current time.
    async fn create_sensor_reading(
        &self,
        reading: &SensorReading,
    ) -> Result<SensorReading, StorageError>;

    /// Return readings of one sensor inside an inclusive time window.
    async fn get_sensor_readings_for_time_range(
        &self,
        query: &TimeRangeQuery,
    ) -> Result<Vec<SensorReading>, StorageError>;

    /// Bring the schema up to date.
    async fn run_migrations(&self) -> Result<(), StorageError>;

    /// Release the handle.
    async fn close(&self) -> Result<(), StorageError>;
}
