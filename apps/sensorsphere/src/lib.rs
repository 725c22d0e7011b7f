#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! SensorSphere - Sensor Telemetry Gateway
//!
//! Serves sensor and sensor-reading operations identically over HTTP/JSON
//! and gRPC, backed by one storage collaborator.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Sensors, locations, readings and time-range queries
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `Database` and `Authorizer` capabilities
//!   - `services`: The seven domain operations and their validation
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `http`: Generic request adaptor, router and access log
//!   - `grpc`: Wire codec, service, authentication and middleware chain
//!   - `tls`: Server certificates and client verification
//!   - `authz`: Casbin policy enforcement
//!   - `persistence`: In-memory storage
//!   - `config`: Environment configuration
//!   - `telemetry`: Logging and OpenTelemetry export
//!
//! - **Agent**: Startup order and exactly-once teardown
//!
//! # Request Flow
//!
//! ```text
//! HTTP  ──► access log ──► adaptor (decode → op → encode) ──┐
//!                                                           ├──► SensorService ──► Database
//! gRPC  ──► tags ──► log ──► authenticate ──► trace ──► codec ┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Telemetry values with no transport dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Service lifecycle orchestration.
pub mod agent;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{GetSensorRequest, Location, Sensor, SensorReading, TimeRangeQuery};

// Application
pub use application::ports::{AuthorizationError, Authorizer, Database, StorageError};
pub use application::services::{SensorService, ServiceError};

// Infrastructure config
pub use infrastructure::config::{AgentConfig, ConfigError};
pub use infrastructure::persistence::InMemoryDatabase;

// Lifecycle
pub use agent::{Agent, AgentError, LifecycleState, ShutdownError};
