//! Gateway Configuration Settings
//!
//! Configuration types for the gateway, loaded from environment variables.
//! Parsing goes through a lookup function so tests can supply variables
//! without touching the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::infrastructure::telemetry::TelemetryConfig;

/// Default node name, also the suffix of the tracer name.
pub const DEFAULT_NODE_NAME: &str = "sensorsphere-0";

/// Default HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default gRPC listener port.
pub const DEFAULT_GRPC_PORT: u16 = 8081;

/// Default OTLP endpoint.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Compact log output.
    #[default]
    Production,
    /// Pretty, human-oriented log output.
    Development,
}

impl Environment {
    /// Parse environment from string. Anything but `development` is production.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        }
    }

    /// Check if this is the development environment.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Listener addresses.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Host both listeners bind to.
    pub bind_addr: IpAddr,
    /// HTTP listener port.
    pub http_port: u16,
    /// gRPC listener port.
    pub grpc_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            grpc_port: DEFAULT_GRPC_PORT,
        }
    }
}

impl ServerSettings {
    /// HTTP socket address.
    #[must_use]
    pub const fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }

    /// gRPC socket address.
    #[must_use]
    pub const fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.grpc_port)
    }
}

/// gRPC transport security settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// Serve gRPC over TLS.
    pub enabled: bool,
    /// Server certificate (PEM).
    pub cert_path: Option<PathBuf>,
    /// Server private key (PEM).
    pub key_path: Option<PathBuf>,
    /// CA for verifying client certificates.
    pub ca_path: Option<PathBuf>,
    /// Reject clients without a certificate.
    pub client_auth_required: bool,
}

/// Casbin policy files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclSettings {
    /// Model definition.
    pub model_file: PathBuf,
    /// Policy rules (CSV).
    pub policy_file: PathBuf,
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Node name used in logs and the default tracer name.
    pub node_name: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Listener addresses.
    pub server: ServerSettings,
    /// gRPC TLS settings.
    pub tls: TlsSettings,
    /// Access-control policy. `None` allows every request.
    pub acl: Option<AclSettings>,
    /// Trace export settings.
    pub telemetry: TelemetryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            environment: Environment::default(),
            server: ServerSettings::default(),
            tls: TlsSettings::default(),
            acl: None,
            telemetry: TelemetryConfig::for_node(DEFAULT_NODE_NAME),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the ACL settings are
    /// incomplete.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let node_name =
            get("SENSORSPHERE_NODE_NAME").unwrap_or_else(|| DEFAULT_NODE_NAME.to_string());

        let environment = get("SENSORSPHERE_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let defaults = ServerSettings::default();
        let server = ServerSettings {
            bind_addr: parse_or(
                "SENSORSPHERE_BIND_ADDR",
                get("SENSORSPHERE_BIND_ADDR"),
                defaults.bind_addr,
            )?,
            http_port: parse_or(
                "SENSORSPHERE_HTTP_PORT",
                get("SENSORSPHERE_HTTP_PORT"),
                defaults.http_port,
            )?,
            grpc_port: parse_or(
                "SENSORSPHERE_GRPC_PORT",
                get("SENSORSPHERE_GRPC_PORT"),
                defaults.grpc_port,
            )?,
        };

        let tls = TlsSettings {
            enabled: parse_bool(get("GRPC_TLS_ENABLED")),
            cert_path: get("GRPC_TLS_CERT_PATH").map(PathBuf::from),
            key_path: get("GRPC_TLS_KEY_PATH").map(PathBuf::from),
            ca_path: get("GRPC_TLS_CA_PATH").map(PathBuf::from),
            client_auth_required: parse_bool(get("GRPC_TLS_CLIENT_AUTH")),
        };

        let acl = match (
            get("SENSORSPHERE_ACL_MODEL_FILE"),
            get("SENSORSPHERE_ACL_POLICY_FILE"),
        ) {
            (Some(model), Some(policy)) => Some(AclSettings {
                model_file: PathBuf::from(model),
                policy_file: PathBuf::from(policy),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAcl),
        };

        let mut telemetry = TelemetryConfig::for_node(&node_name);
        telemetry.enabled = parse_bool(get("OTEL_ENABLED"));
        telemetry.development = environment.is_development();
        if let Some(endpoint) = get("OTEL_EXPORTER_OTLP_ENDPOINT") {
            telemetry.otlp_endpoint = endpoint;
        }
        if let Some(service_name) = get("OTEL_SERVICE_NAME") {
            telemetry.service_name = service_name;
        }

        Ok(Self {
            node_name,
            environment,
            server,
            tls,
            acl,
            telemetry,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// Only one of the two ACL file variables is set.
    #[error("SENSORSPHERE_ACL_MODEL_FILE and SENSORSPHERE_ACL_POLICY_FILE must be set together")]
    IncompleteAcl,
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |v| {
        v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        })
    })
}

fn parse_bool(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}
