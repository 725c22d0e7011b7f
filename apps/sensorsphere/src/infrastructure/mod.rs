//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus both transports.

/// Casbin and allow-all authorizers.
pub mod authz;

/// Environment-driven configuration.
pub mod config;

/// gRPC transport, interceptor chain and wire codec.
pub mod grpc;

/// HTTP/JSON transport and generic request adaptor.
pub mod http;

/// Storage adapters.
pub mod persistence;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;

/// TLS material for the gRPC listener.
pub mod tls;
