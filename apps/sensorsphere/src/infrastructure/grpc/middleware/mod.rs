//! gRPC Middleware Chain
//!
//! Every call passes through, in order:
//!
//! 1. [`ContextTagLayer`] - request id, service, method and peer tags
//! 2. [`GrpcLoggingLayer`] - access log with status and `grpc.time_ns`
//! 3. [`authenticate`](super::auth::authenticate) - caller identity
//! 4. [`GrpcTraceLayer`] - distributed trace span
//!
//! The first two wrap the whole router; authentication and tracing wrap the
//! service itself.

mod context;
mod logging;
mod trace;

use tonic::codegen::http::HeaderMap;

pub use context::{CallTags, ContextTagLayer, ContextTagService};
pub use logging::{GrpcLoggingLayer, GrpcLoggingService};
pub use trace::{GrpcTraceLayer, GrpcTraceService};

/// Split `/package.Service/Method` into service and method.
fn split_path(path: &str) -> (&str, &str) {
    path.trim_start_matches('/')
        .split_once('/')
        .unwrap_or(("unknown", path))
}

/// gRPC status code from response headers. Successful unary responses carry
/// their status in trailers, so a missing header means OK.
fn grpc_status(headers: &HeaderMap) -> i32 {
    headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}
