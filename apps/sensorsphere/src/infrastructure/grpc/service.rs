//! gRPC Service Implementation
//!
//! Implements `SensorSphereService` by converting wire messages to domain
//! values and dispatching into [`SensorService`]. Operation errors reach the
//! client as `Unknown` with the raw error text.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use super::auth::CallIdentity;
use super::proto::sensorsphere::v1::{
    self as proto, UpdateSensorResponse, sensor_sphere_service_server::SensorSphereService,
};
use crate::application::ports::{AuthorizationError, Authorizer, OBJECT_WILDCARD};
use crate::application::services::{SensorService, ServiceError};
use crate::domain::{GetSensorRequest, Location, Sensor, SensorReading, TimeRangeQuery};

// =============================================================================
// Type Aliases
// =============================================================================

type GrpcResult<T> = Result<Response<T>, Status>;

// =============================================================================
// Service
// =============================================================================

/// gRPC binding of the domain operations.
#[derive(Clone)]
pub struct SensorSphereGrpcService {
    sensors: SensorService,
    authorizer: Arc<dyn Authorizer>,
}

impl std::fmt::Debug for SensorSphereGrpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSphereGrpcService")
            .field("sensors", &self.sensors)
            .finish_non_exhaustive()
    }
}

impl SensorSphereGrpcService {
    /// Create the service.
    #[must_use]
    pub fn new(sensors: SensorService, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            sensors,
            authorizer,
        }
    }

    /// Check that `identity` may perform `action` on every resource.
    ///
    /// None of the handlers below call this. Deployments that need access
    /// control invoke it per operation.
    pub async fn authorize(&self, identity: &CallIdentity, action: &str) -> Result<(), Status> {
        self.authorizer
            .authorize(&identity.subject, OBJECT_WILDCARD, action)
            .await
            .map_err(|e| match e {
                AuthorizationError::Denied { .. } => Status::permission_denied(e.to_string()),
                AuthorizationError::Engine(_) => Status::internal(e.to_string()),
            })
    }
}

fn to_status(e: &ServiceError) -> Status {
    Status::unknown(e.to_string())
}

#[tonic::async_trait]
impl SensorSphereService for SensorSphereGrpcService {
    async fn create_sensor(&self, request: Request<proto::Sensor>) -> GrpcResult<proto::Sensor> {
        let sensor = Sensor::from(request.into_inner());
        let created = self
            .sensors
            .create_sensor(sensor)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(created.into()))
    }

    async fn get_sensor(
        &self,
        request: Request<proto::GetSensorRequest>,
    ) -> GrpcResult<proto::Sensor> {
        let lookup = GetSensorRequest::from(request.into_inner());
        let sensor = self
            .sensors
            .get_sensor(lookup)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(sensor.into()))
    }

    async fn update_sensor(
        &self,
        request: Request<proto::Sensor>,
    ) -> GrpcResult<UpdateSensorResponse> {
        let sensor = Sensor::from(request.into_inner());
        let rows = self
            .sensors
            .update_sensor(sensor)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(UpdateSensorResponse {
            rows_affected: i64::try_from(rows).unwrap_or(i64::MAX),
        }))
    }

    async fn get_nearest_sensor(
        &self,
        request: Request<proto::Location>,
    ) -> GrpcResult<proto::Sensor> {
        let location = Location::from(request.into_inner());
        let sensor = self
            .sensors
            .get_nearest_sensor(location)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(sensor.into()))
    }

    async fn create_sensor_reading(
        &self,
        request: Request<proto::SensorReading>,
    ) -> GrpcResult<proto::SensorReading> {
        let reading = SensorReading::try_from(request.into_inner())?;
        let created = self
            .sensors
            .create_sensor_reading(reading)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(created.into()))
    }

    async fn get_sensor_readings_for_time_range(
        &self,
        request: Request<proto::TimeRangeQuery>,
    ) -> GrpcResult<proto::SensorReadingsResponse> {
        let query = TimeRangeQuery::try_from(request.into_inner())?;
        let readings = self
            .sensors
            .get_sensor_readings_for_time_range(query)
            .await
            .map_err(|e| to_status(&e))?;
        Ok(Response::new(proto::SensorReadingsResponse {
            sensor_readings: readings.into_iter().map(Into::into).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockAuthorizer, MockDatabase, StorageError};
    use chrono::{TimeZone, Utc};
    use prost_types::Timestamp;

    fn service(db: MockDatabase) -> SensorSphereGrpcService {
        service_with(db, MockAuthorizer::new())
    }

    fn service_with(db: MockDatabase, authz: MockAuthorizer) -> SensorSphereGrpcService {
        SensorSphereGrpcService::new(SensorService::new(Arc::new(db)), Arc::new(authz))
    }

    fn wire_sensor(name: &str) -> proto::Sensor {
        proto::Sensor {
            name: name.to_string(),
            location: Some(proto::Location {
                latitude: 10.0,
                longitude: 20.0,
            }),
            tags: vec!["a".to_string()],
        }
    }

    #[tokio::test]
    async fn create_sensor_round_trips_through_domain() {
        let mut db = MockDatabase::new();
        db.expect_create_sensor()
            .withf(|s| s.tags == Some(vec!["a".to_string()]))
            .times(1)
            .returning(|s| Ok(s.clone()));

        let created = service(db)
            .create_sensor(Request::new(wire_sensor("s1")))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(created, wire_sensor("s1"));
    }

    #[tokio::test]
    async fn validation_failure_is_unknown_with_raw_message() {
        let mut db = MockDatabase::new();
        db.expect_get_nearest_sensor().times(0);

        let status = service(db)
            .get_nearest_sensor(Request::new(proto::Location {
                latitude: 0.0,
                longitude: 0.0,
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unknown);
        assert_eq!(status.message(), "missing required fields");
    }

    #[tokio::test]
    async fn storage_failure_is_unknown_with_raw_message() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor()
            .returning(|_| Err(StorageError::NotFound));

        let status = service(db)
            .get_sensor(Request::new(proto::GetSensorRequest {
                name: "ghost".to_string(),
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unknown);
        assert_eq!(status.message(), "no rows in result set");
    }

    #[tokio::test]
    async fn update_reports_rows_affected() {
        let mut db = MockDatabase::new();
        db.expect_update_sensor().times(1).returning(|_| Ok(1));

        let response = service(db)
            .update_sensor(Request::new(wire_sensor("s1")))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.rows_affected, 1);
    }

    #[tokio::test]
    async fn created_reading_has_time() {
        let stamped = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut db = MockDatabase::new();
        db.expect_create_sensor_reading()
            .returning(move |r| Ok(r.clone().at(stamped)));

        let reading = service(db)
            .create_sensor_reading(Request::new(proto::SensorReading {
                sensor_name: "s1".to_string(),
                time: None,
                value: 2.5,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(
            reading.time,
            Some(Timestamp {
                seconds: stamped.timestamp(),
                nanos: 0
            })
        );
    }

    #[tokio::test]
    async fn bad_timestamp_is_invalid_argument() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor_readings_for_time_range().times(0);

        let status = service(db)
            .get_sensor_readings_for_time_range(Request::new(proto::TimeRangeQuery {
                sensor_name: "s1".to_string(),
                start_time: Some(Timestamp {
                    seconds: 0,
                    nanos: -5,
                }),
                end_time: None,
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn range_query_returns_every_reading() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor_readings_for_time_range()
            .returning(|q| {
                Ok(vec![
                    SensorReading::new(q.sensor_name.clone(), 1.0),
                    SensorReading::new(q.sensor_name.clone(), 2.0),
                ])
            });
        let now = Utc::now();

        let response = service(db)
            .get_sensor_readings_for_time_range(Request::new(
                TimeRangeQuery::new("s1", now, now).into(),
            ))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.sensor_readings.len(), 2);
    }

    #[tokio::test]
    async fn handlers_never_consult_the_authorizer() {
        let mut db = MockDatabase::new();
        db.expect_create_sensor().returning(|s| Ok(s.clone()));
        let mut authz = MockAuthorizer::new();
        authz.expect_authorize().times(0);

        service_with(db, authz)
            .create_sensor(Request::new(wire_sensor("s1")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn explicit_authorize_maps_denial() {
        let mut authz = MockAuthorizer::new();
        authz
            .expect_authorize()
            .withf(|subject, object, action| {
                subject == "mallory" && object == OBJECT_WILDCARD && action == "produce"
            })
            .returning(|subject, object, action| {
                Err(AuthorizationError::Denied {
                    subject: subject.to_string(),
                    object: object.to_string(),
                    action: action.to_string(),
                })
            });

        let status = service_with(MockDatabase::new(), authz)
            .authorize(&CallIdentity::new("mallory"), "produce")
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert_eq!(status.message(), "mallory not permitted to produce to *");
    }
}
