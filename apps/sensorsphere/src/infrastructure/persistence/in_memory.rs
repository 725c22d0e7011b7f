//! In-Memory Storage
//!
//! Process-local `Database` implementation. Sensors and readings live in
//! insertion order behind a single `RwLock`; the nearest-sensor query scans
//! every sensor using squared planar distance.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::application::ports::{Database, StorageError};
use crate::domain::{Location, Sensor, SensorReading, TimeRangeQuery};

#[derive(Debug, Default)]
struct Tables {
    sensors: Vec<Sensor>,
    readings: Vec<SensorReading>,
    closed: bool,
}

impl Tables {
    const fn open(&self) -> Result<(), StorageError> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Storage held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sensors.
    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.tables.read().sensors.len()
    }

    /// True once `close` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tables.read().closed
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn create_sensor(&self, sensor: &Sensor) -> Result<Sensor, StorageError> {
        let mut tables = self.tables.write();
        tables.open()?;
        if tables.sensors.iter().any(|s| s.name == sensor.name) {
            return Err(StorageError::Duplicate(sensor.name.clone()));
        }
        tables.sensors.push(sensor.clone());
        Ok(sensor.clone())
    }

    async fn get_sensor(&self, name: &str) -> Result<Sensor, StorageError> {
        let tables = self.tables.read();
        tables.open()?;
        tables
            .sensors
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_sensor(&self, sensor: &Sensor) -> Result<u64, StorageError> {
        let mut tables = self.tables.write();
        tables.open()?;
        match tables.sensors.iter_mut().find(|s| s.name == sensor.name) {
            Some(stored) => {
                stored.location = sensor.location;
                stored.tags.clone_from(&sensor.tags);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_nearest_sensor(&self, location: &Location) -> Result<Sensor, StorageError> {
        let tables = self.tables.read();
        tables.open()?;
        let mut nearest: Option<(&Sensor, f64)> = None;
        for sensor in &tables.sensors {
            let distance = sensor.location.distance_squared(location);
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((sensor, distance));
            }
        }
        nearest
            .map(|(sensor, _)| sensor.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn create_sensor_reading(
        &self,
        reading: &SensorReading,
    ) -> Result<SensorReading, StorageError> {
        let mut tables = self.tables.write();
        tables.open()?;
        let stored = reading.clone().at(Utc::now());
        tables.readings.push(stored.clone());
        Ok(stored)
    }

    async fn get_sensor_readings_for_time_range(
        &self,
        query: &TimeRangeQuery,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let tables = self.tables.read();
        tables.open()?;
        Ok(tables
            .readings
            .iter()
            .filter(|r| r.sensor_name == query.sensor_name)
            .filter(|r| r.time.is_some_and(|t| query.contains(t)))
            .cloned()
            .collect())
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        self.tables.read().open()?;
        tracing::debug!("in-memory schema ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        tables.open()?;
        tables.closed = true;
        Ok(())
    }
}
