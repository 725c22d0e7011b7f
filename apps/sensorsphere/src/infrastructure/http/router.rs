//! HTTP Routes
//!
//! Binds each domain operation to its method and path through [`adapt`].

use std::time::Instant;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};

use super::adaptor::adapt;
use crate::application::services::SensorService;

/// Build the HTTP router over `service`.
pub fn create_router(service: SensorService) -> Router {
    Router::new()
        .route(
            "/sensors",
            post(adapt(|svc: SensorService, sensor| async move {
                svc.create_sensor(sensor).await
            })),
        )
        .route(
            "/sensors/nearest",
            get(adapt(|svc: SensorService, location| async move {
                svc.get_nearest_sensor(location).await
            })),
        )
        .route(
            "/sensors/{name}",
            get(adapt(|svc: SensorService, request| async move {
                svc.get_sensor(request).await
            }))
            .put(adapt(|svc: SensorService, sensor| async move {
                svc.update_sensor(sensor).await
            })),
        )
        .route(
            "/sensor_readings",
            post(adapt(|svc: SensorService, reading| async move {
                svc.create_sensor_reading(reading).await
            }))
            .get(adapt(|svc: SensorService, query| async move {
                svc.get_sensor_readings_for_time_range(query).await
            })),
        )
        .route("/status", get(status))
        .layer(middleware::from_fn(log_request))
        .with_state(service)
}

async fn status(State(service): State<SensorService>) -> &'static str {
    service.status()
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        http.method = %method,
        http.path = %path,
        http.status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "http request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::ports::{MockDatabase, StorageError};
    use crate::domain::{Location, Sensor};

    fn router(db: MockDatabase) -> Router {
        create_router(SensorService::new(Arc::new(db)))
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn create_sensor_echoes_stored_sensor() {
        let mut db = MockDatabase::new();
        db.expect_create_sensor()
            .times(1)
            .returning(|s| Ok(s.clone()));
        let body = r#"{"name":"s1","location":{"latitude":10,"longitude":20},"tags":["a"]}"#;

        let (status, response) = call(router(db), "POST", "/sensors", body).await;

        assert_eq!(status, StatusCode::OK);
        let returned: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(
            returned,
            json!({"name": "s1", "location": {"latitude": 10.0, "longitude": 20.0}, "tags": ["a"]})
        );
    }

    #[tokio::test]
    async fn nearest_at_origin_is_rejected_before_storage() {
        let mut db = MockDatabase::new();
        db.expect_get_nearest_sensor().times(0);

        let (status, body) = call(
            router(db),
            "GET",
            "/sensors/nearest",
            r#"{"latitude":0,"longitude":0}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "missing required fields");
    }

    #[tokio::test]
    async fn range_query_without_sensor_name_is_rejected_before_storage() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor_readings_for_time_range().times(0);

        let (status, body) = call(
            router(db),
            "GET",
            "/sensor_readings",
            r#"{"sensorName":"","startTime":"2024-01-01T00:00:00Z","endTime":"2024-01-02T00:00:00Z"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "missing required fields");
    }

    #[tokio::test]
    async fn get_sensor_reads_name_from_path() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor()
            .withf(|name| name == "s9")
            .times(1)
            .returning(|name| Ok(Sensor::new(name, Location::new(1.0, 2.0), vec![])));

        let (status, body) = call(router(db), "GET", "/sensors/s9", "").await;

        assert_eq!(status, StatusCode::OK);
        let returned: Sensor = serde_json::from_str(&body).unwrap();
        assert_eq!(returned.name, "s9");
    }

    #[tokio::test]
    async fn update_returns_rows_affected_as_number() {
        let mut db = MockDatabase::new();
        db.expect_update_sensor().times(1).returning(|_| Ok(1));
        let body = r#"{"name":"s1","location":{"latitude":1,"longitude":2},"tags":[]}"#;

        let (status, response) = call(router(db), "PUT", "/sensors/s1", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, "1");
    }

    #[tokio::test]
    async fn storage_errors_surface_as_raw_text() {
        let mut db = MockDatabase::new();
        db.expect_get_sensor()
            .returning(|_| Err(StorageError::NotFound));

        let (status, body) = call(router(db), "GET", "/sensors/ghost", "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "no rows in result set");
    }

    #[tokio::test]
    async fn malformed_body_is_internal_error() {
        let mut db = MockDatabase::new();
        db.expect_create_sensor().times(0);

        let (status, _) = call(router(db), "POST", "/sensors", "{oops").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn status_is_plain_text() {
        let response = router(MockDatabase::new())
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Server is running");
    }
}
