//! Sensor Service
//!
//! The seven domain operations behind both transports. Each operation checks
//! its required fields first and returns [`ServiceError::Validation`] without
//! touching storage when one is missing. Storage failures, including "no
//! rows", pass through unchanged.

use std::sync::Arc;

use tracing::instrument;

use crate::application::ports::{Database, StorageError};
use crate::domain::{GetSensorRequest, Location, Sensor, SensorReading, TimeRangeQuery};

/// Message returned for any missing or zero-valued required field.
pub const MISSING_FIELDS: &str = "missing required fields";

/// Body of the liveness response.
pub const STATUS_MESSAGE: &str = "Server is running";

/// Errors returned by domain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// A required field was empty, zero or absent.
    #[error("missing required fields")]
    Validation,

    /// The storage collaborator failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Domain operations over a shared storage handle.
#[derive(Clone)]
pub struct SensorService {
    db: Arc<dyn Database>,
}

impl std::fmt::Debug for SensorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorService").finish_non_exhaustive()
    }
}

impl SensorService {
    /// Create a service backed by `db`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Register a new sensor.
    #[instrument(skip_all, fields(sensor = %sensor.name))]
    pub async fn create_sensor(&self, sensor: Sensor) -> Result<Sensor, ServiceError> {
        validate_sensor(&sensor)?;
        Ok(self.db.create_sensor(&sensor).await?)
    }

    /// Fetch a sensor by name.
    #[instrument(skip_all, fields(sensor = %request.name))]
    pub async fn get_sensor(&self, request: GetSensorRequest) -> Result<Sensor, ServiceError> {
        require(!request.name.is_empty())?;
        Ok(self.db.get_sensor(&request.name).await?)
    }

    /// Replace a sensor's location and tags. Returns rows affected.
    #[instrument(skip_all, fields(sensor = %sensor.name))]
    pub async fn update_sensor(&self, sensor: Sensor) -> Result<u64, ServiceError> {
        validate_sensor(&sensor)?;
        Ok(self.db.update_sensor(&sensor).await?)
    }

    /// Find the sensor closest to `location`.
    #[instrument(skip(self))]
    pub async fn get_nearest_sensor(&self, location: Location) -> Result<Sensor, ServiceError> {
        require(location.is_set())?;
        Ok(self.db.get_nearest_sensor(&location).await?)
    }

    /// Record a reading. Storage assigns its time.
    #[instrument(skip_all, fields(sensor = %reading.sensor_name))]
    pub async fn create_sensor_reading(
        &self,
        reading: SensorReading,
    ) -> Result<SensorReading, ServiceError> {
        require(!reading.sensor_name.is_empty() && reading.value != 0.0)?;
        Ok(self.db.create_sensor_reading(&reading).await?)
    }

    /// List a sensor's readings inside an inclusive window.
    #[instrument(skip_all, fields(sensor = %query.sensor_name))]
    pub async fn get_sensor_readings_for_time_range(
        &self,
        query: TimeRangeQuery,
    ) -> Result<Vec<SensorReading>, ServiceError> {
        require(
            !query.sensor_name.is_empty() && query.start_time.is_some() && query.end_time.is_some(),
        )?;
        Ok(self.db.get_sensor_readings_for_time_range(&query).await?)
    }

    /// Liveness only. Dependencies are not checked.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        STATUS_MESSAGE
    }
}

fn validate_sensor(sensor: &Sensor) -> Result<(), ServiceError> {
    require(!sensor.name.is_empty() && sensor.location.is_set() && sensor.tags.is_some())
}

const fn require(ok: bool) -> Result<(), ServiceError> {
    if ok {
        Ok(())
    } else {
        Err(ServiceError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockDatabase;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn service(db: MockDatabase) -> SensorService {
        SensorService::new(Arc::new(db))
    }

    /// Storage mock that fails the test on any call.
    fn untouched() -> MockDatabase {
        let mut db = MockDatabase::new();
        db.expect_create_sensor().times(0);
        db.expect_get_sensor().times(0);
        db.expect_update_sensor().times(0);
        db.expect_get_nearest_sensor().times(0);
        db.expect_create_sensor_reading().times(0);
        db.expect_get_sensor_readings_for_time_range().times(0);
        db
    }

    fn valid_sensor() -> Sensor {
        Sensor::new("s1", Location::new(10.0, 20.0), vec!["a".to_string()])
    }

    #[test_case(Sensor { name: String::new(), ..valid_sensor() } ; "empty name")]
    #[test_case(Sensor { location: Location::new(0.0, 20.0), ..valid_sensor() } ; "zero latitude")]
    #[test_case(Sensor { location: Location::new(10.0, 0.0), ..valid_sensor() } ; "zero longitude")]
    #[test_case(Sensor { location: Location::default(), ..valid_sensor() } ; "origin")]
    #[test_case(Sensor { tags: None, ..valid_sensor() } ; "absent tags")]
    #[tokio::test]
    async fn invalid_sensors_never_reach_storage(sensor: Sensor) {
        let svc = service(untouched());

        assert_eq!(
            svc.create_sensor(sensor.clone()).await,
            Err(ServiceError::Validation)
        );
        assert_eq!(svc.update_sensor(sensor).await, Err(ServiceError::Validation));
    }

    #[tokio::test]
    async fn empty_tag_list_is_accepted() {
        let mut db = MockDatabase::new();
        db.expect_create_sensor()
            .times(1)
            .returning(|s| Ok(s.clone()));
        let sensor = Sensor::new("s1", Location::new(1.0, 1.0), vec![]);

        assert_eq!(service(db).create_sensor(sensor.clone()).await, Ok(sensor));
    }

    #[tokio::test]
    async fn update_returns_rows_affected() {
        let mut db = MockDatabase::new();
        db.expect_update_sensor()
            .withf(|s| s.name == "s1")
            .times(1)
            .returning(|_| Ok(1));

        assert_eq!(service(db).update_sensor(valid_sensor()).await, Ok(1));
    }

    #[tokio::test]
    async fn get_sensor_requires_name() {
        let svc = service(untouched());

        assert_eq!(
            svc.get_sensor(GetSensorRequest::default()).await,
            Err(ServiceError::Validation)
        );
    }

    #[tokio::test]
    async fn get_sensor_surfaces_not_found() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor()
            .withf(|name| name == "ghost")
            .returning(|_| Err(StorageError::NotFound));

        let err = service(db)
            .get_sensor(GetSensorRequest::new("ghost"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "no rows in result set");
    }

    #[test_case(0.0, 0.0 ; "origin")]
    #[test_case(0.0, 5.0 ; "equator")]
    #[test_case(5.0, 0.0 ; "prime meridian")]
    #[tokio::test]
    async fn nearest_rejects_zero_coordinates(latitude: f64, longitude: f64) {
        let svc = service(untouched());

        assert_eq!(
            svc.get_nearest_sensor(Location::new(latitude, longitude)).await,
            Err(ServiceError::Validation)
        );
    }

    #[tokio::test]
    async fn nearest_delegates_valid_location() {
        let mut db = MockDatabase::new();
        db.expect_get_nearest_sensor()
            .withf(|l| *l == Location::new(1.5, 2.5))
            .times(1)
            .returning(|_| Ok(valid_sensor()));

        let found = service(db)
            .get_nearest_sensor(Location::new(1.5, 2.5))
            .await
            .unwrap();

        assert_eq!(found.name, "s1");
    }

    #[test_case(SensorReading::new("", 1.0) ; "empty sensor name")]
    #[test_case(SensorReading::new("s1", 0.0) ; "zero value")]
    #[tokio::test]
    async fn invalid_readings_never_reach_storage(reading: SensorReading) {
        assert_eq!(
            service(untouched()).create_sensor_reading(reading).await,
            Err(ServiceError::Validation)
        );
    }

    #[tokio::test]
    async fn created_reading_carries_storage_time() {
        let stamped = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut db = MockDatabase::new();
        db.expect_create_sensor_reading()
            .times(1)
            .returning(move |r| Ok(r.clone().at(stamped)));

        let created = service(db)
            .create_sensor_reading(SensorReading::new("s1", 3.5))
            .await
            .unwrap();

        assert_eq!(created.time, Some(stamped));
    }

    #[test_case(TimeRangeQuery { sensor_name: String::new(), ..full_query() } ; "empty sensor name")]
    #[test_case(TimeRangeQuery { start_time: None, ..full_query() } ; "missing start")]
    #[test_case(TimeRangeQuery { end_time: None, ..full_query() } ; "missing end")]
    #[tokio::test]
    async fn invalid_range_queries_never_reach_storage(query: TimeRangeQuery) {
        assert_eq!(
            service(untouched())
                .get_sensor_readings_for_time_range(query)
                .await,
            Err(ServiceError::Validation)
        );
    }

    fn full_query() -> TimeRangeQuery {
        TimeRangeQuery::new(
            "s1",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn range_query_may_be_empty() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor_readings_for_time_range()
            .times(1)
            .returning(|_| Ok(vec![]));

        let readings = service(db)
            .get_sensor_readings_for_time_range(full_query())
            .await
            .unwrap();

        assert!(readings.is_empty());
    }

    #[test]
    fn status_is_fixed_text() {
        assert_eq!(service(untouched()).status(), "Server is running");
    }

    #[test]
    fn validation_message_is_stable() {
        assert_eq!(ServiceError::Validation.to_string(), MISSING_FIELDS);
    }
}
