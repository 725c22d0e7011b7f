//! gRPC Transport
//!
//! Serves the domain operations over gRPC using the checked-in prost/tonic
//! code generated from `packages/proto/sensorsphere/v1/sensorsphere.proto`.
//!
//! # Call Path
//!
//! 1. Context tagging and access logging wrap the router
//! 2. The authentication interceptor resolves the caller's identity
//! 3. The trace layer opens the `rpc` span
//! 4. [`SensorSphereGrpcService`] converts wire messages and dispatches into
//!    the sensor service

pub mod auth;
pub mod codec;
pub mod middleware;
pub mod server;
pub mod service;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod sensorsphere {
        pub mod v1 {
            include!("../../../../../packages/schema-gen/rust/sensorsphere/v1/sensorsphere.v1.rs");
        }
    }
}

pub use auth::{CallIdentity, PeerInfo, authenticate};
pub use server::{GrpcServer, GrpcServerError, bind};
pub use service::SensorSphereGrpcService;
