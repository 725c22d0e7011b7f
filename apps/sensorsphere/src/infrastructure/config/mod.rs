//! Configuration Module
//!
//! Environment-driven configuration for the gateway.

mod settings;

pub use settings::{
    AclSettings, AgentConfig, ConfigError, DEFAULT_GRPC_PORT, DEFAULT_HTTP_PORT,
    DEFAULT_NODE_NAME, DEFAULT_OTLP_ENDPOINT, Environment, ServerSettings, TlsSettings,
};
