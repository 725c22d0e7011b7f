//! Generic Transport Adaptor
//!
//! Turns a protocol-agnostic operation `(context, In) -> Result<Out, E>` into
//! an axum handler:
//!
//! 1. Decode `In` from the JSON body. When the body is empty, decode it from
//!    the path and query parameters instead, matching keys to `In`'s field
//!    names case-insensitively. Any decode failure is a 500 carrying the
//!    decoder's message.
//! 2. Invoke the operation. An operation error is a 400 whose body is the
//!    error's `Display` text.
//! 3. Encode `Out` as JSON and set `Content-Type: application/json` once the
//!    body is in place.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::{DeserializeOwned, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Response future produced by an adapted handler.
pub type AdaptedFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Failures raised by the adaptor itself or by the wrapped operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdaptorError {
    /// The request could not be decoded into the operation's input.
    #[error("{0}")]
    Decode(String),

    /// The operation returned an error.
    #[error("{0}")]
    Operation(String),

    /// The operation's output could not be encoded.
    #[error("{0}")]
    Encode(String),
}

impl AdaptorError {
    /// HTTP status for this failure.
    ///
    /// Decode failures are reported as 500 rather than 400, matching the
    /// status existing clients already handle.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Operation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AdaptorError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

// =============================================================================
// Raw Input Extraction
// =============================================================================

/// Undecoded request input: the body plus merged query and path parameters.
///
/// Path parameters win over query parameters with the same key.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    params: BTreeMap<String, String>,
    body: Bytes,
}

impl RawInput {
    /// Build an input from its parts.
    #[must_use]
    pub const fn new(params: BTreeMap<String, String>, body: Bytes) -> Self {
        Self { params, body }
    }

    /// True when the body carries no JSON value.
    #[must_use]
    pub fn body_is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Decode the input as `In`, falling back to parameters for an empty body.
    pub fn decode<In: DeserializeOwned>(self) -> Result<In, AdaptorError> {
        let decoded = if self.body_is_empty() {
            In::deserialize(ParamsDeserializer(self.params))
        } else {
            serde_json::from_slice(&self.body)
        };
        decoded.map_err(|e| AdaptorError::Decode(e.to_string()))
    }
}

impl<S> FromRequest<S> for RawInput
where
    S: Send + Sync,
{
    type Rejection = AdaptorError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let mut params = BTreeMap::new();

        if let Ok(Query(query)) =
            Query::<BTreeMap<String, String>>::from_request_parts(&mut parts, state).await
        {
            params.extend(query);
        }
        // Routes without placeholders have no path parameters to merge.
        if let Ok(path) = RawPathParams::from_request_parts(&mut parts, state).await {
            params.extend(path.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }

        let body = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| AdaptorError::Decode(e.body_text()))?;

        Ok(Self { params, body })
    }
}

// =============================================================================
// Adaptor
// =============================================================================

/// Wrap `op` as an axum handler over router state `C`.
///
/// The returned closure extracts [`RawInput`], decodes `In`, runs the
/// operation with a clone of the state and encodes the outcome. Dropping the
/// response future (client disconnect) drops the operation future with it.
pub fn adapt<C, In, Out, E, F, Fut>(
    op: F,
) -> impl Fn(State<C>, RawInput) -> AdaptedFuture + Clone + Send + Sync + 'static
where
    C: Clone + Send + Sync + 'static,
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    E: Display + Send + 'static,
    F: Fn(C, In) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
{
    move |State(ctx): State<C>, input: RawInput| -> AdaptedFuture {
        let op = op.clone();
        Box::pin(async move {
            match invoke(op, ctx, input).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(status = %e.status(), error = %e, "request failed");
                    e.into_response()
                }
            }
        })
    }
}

async fn invoke<C, In, Out, E, F, Fut>(
    op: F,
    ctx: C,
    input: RawInput,
) -> Result<Response, AdaptorError>
where
    In: DeserializeOwned,
    Out: Serialize,
    E: Display,
    F: Fn(C, In) -> Fut,
    Fut: Future<Output = Result<Out, E>>,
{
    let decoded = input.decode::<In>()?;
    let output = op(ctx, decoded)
        .await
        .map_err(|e| AdaptorError::Operation(e.to_string()))?;
    encode(&output)
}

fn encode<Out: Serialize>(output: &Out) -> Result<Response, AdaptorError> {
    let body = serde_json::to_vec(output).map_err(|e| AdaptorError::Encode(e.to_string()))?;
    let mut response = (StatusCode::OK, body).into_response();
    // Headers are flushed with the body, so setting the type here still applies.
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

// =============================================================================
// Parameter Decoding
// =============================================================================

/// Deserializes a flat string map into a struct, matching keys to field names
/// without regard to case. Values stay strings, so only string-typed fields
/// (and types parsed from strings, such as timestamps) can be filled.
struct ParamsDeserializer(BTreeMap<String, String>);

impl ParamsDeserializer {
    fn into_value(self, fields: &[&str]) -> Value {
        let object: Map<String, Value> = self
            .0
            .into_iter()
            .map(|(key, value)| {
                let key = fields
                    .iter()
                    .find(|field| field.eq_ignore_ascii_case(&key))
                    .map_or(key, |field| (*field).to_string());
                (key, Value::String(value))
            })
            .collect();
        Value::Object(object)
    }
}

impl<'de> Deserializer<'de> for ParamsDeserializer {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.into_value(&[]).deserialize_any(visitor)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.into_value(fields)
            .deserialize_struct(name, fields, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GetSensorRequest, Location, TimeRangeQuery};
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn body_wins_over_params() {
        let input = RawInput::new(
            params(&[("name", "from-path")]),
            Bytes::from(r#"{"name":"from-body"}"#),
        );

        let decoded: GetSensorRequest = input.decode().unwrap();

        assert_eq!(decoded.name, "from-body");
    }

    #[test]
    fn empty_body_falls_back_to_params_ignoring_case() {
        let input = RawInput::new(
            params(&[("SENSORNAME", "s1"), ("starttime", "2024-01-01T00:00:00Z")]),
            Bytes::from("  \n"),
        );

        let decoded: TimeRangeQuery = input.decode().unwrap();

        assert_eq!(decoded.sensor_name, "s1");
        assert!(decoded.start_time.is_some());
        assert!(decoded.end_time.is_none());
    }

    #[test]
    fn unknown_params_are_ignored() {
        let input = RawInput::new(params(&[("name", "s1"), ("extra", "x")]), Bytes::new());

        let decoded: GetSensorRequest = input.decode().unwrap();

        assert_eq!(decoded, GetSensorRequest::new("s1"));
    }

    #[test]
    fn non_string_params_fail_to_decode() {
        let input = RawInput::new(params(&[("latitude", "10")]), Bytes::new());

        let err = input.decode::<Location>().unwrap_err();

        assert!(matches!(err, AdaptorError::Decode(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let input = RawInput::new(BTreeMap::new(), Bytes::from("{not json"));

        assert!(matches!(
            input.decode::<GetSensorRequest>(),
            Err(AdaptorError::Decode(_))
        ));
    }

    async fn echo(_: (), name: GetSensorRequest) -> Result<GetSensorRequest, String> {
        if name.name == "bad" {
            Err("rejected".to_string())
        } else {
            Ok(name)
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(adapt(echo)))
            .route("/echo/{name}", get(adapt(echo)))
            .with_state(())
    }

    async fn send(req: Request<Body>) -> (StatusCode, Option<HeaderValue>, String) {
        let response = app().oneshot(req).await.unwrap();
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn success_is_json() {
        let (status, content_type, body) = send(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from(r#"{"name":"s1"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.unwrap(), "application/json");
        assert_eq!(body, r#"{"name":"s1"}"#);
    }

    #[tokio::test]
    async fn path_params_feed_empty_body() {
        let (status, _, body) = send(
            Request::builder()
                .uri("/echo/s2")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"name":"s2"}"#);
    }

    #[tokio::test]
    async fn operation_error_is_bad_request_with_message() {
        let (status, _, body) = send(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from(r#"{"name":"bad"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "rejected");
    }

    #[tokio::test]
    async fn decode_error_is_internal_error() {
        let (status, _, body) = send(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from(r#"{"name":42}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("invalid type"));
    }
}
