//! SensorSphere Binary
//!
//! Starts the HTTP and gRPC listeners and runs until a termination signal or
//! a fatal listener error.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sensorsphere
//! ```
//!
//! # Environment Variables
//!
//! - `SENSORSPHERE_NODE_NAME`: Node name (default: sensorsphere-0)
//! - `SENSORSPHERE_ENV`: production | development (default: production)
//! - `SENSORSPHERE_BIND_ADDR`: Listener host (default: 0.0.0.0)
//! - `SENSORSPHERE_HTTP_PORT`: HTTP port (default: 8080)
//! - `SENSORSPHERE_GRPC_PORT`: gRPC port (default: 8081)
//! - `SENSORSPHERE_ACL_MODEL_FILE`, `SENSORSPHERE_ACL_POLICY_FILE`: Casbin policy
//! - `GRPC_TLS_ENABLED`, `GRPC_TLS_CERT_PATH`, `GRPC_TLS_KEY_PATH`,
//!   `GRPC_TLS_CA_PATH`, `GRPC_TLS_CLIENT_AUTH`: gRPC transport security
//! - `OTEL_ENABLED`: Export traces over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Tracer name (default: sensorsphere.<node>)
//! - `RUST_LOG`: Log filter (default: info)

use std::sync::Arc;

use sensorsphere::{Agent, AgentConfig, InMemoryDatabase};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let config = AgentConfig::from_env()?;
    let agent = Agent::start(config, Arc::new(InMemoryDatabase::new())).await?;

    tokio::select! {
        () = await_shutdown() => {}
        () = agent.wait() => {
            tracing::warn!("listener failure started shutdown");
        }
    }

    agent.shutdown().await?;
    Ok(())
}

/// Load .env from the current directory, falling back to ancestors.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
