//! HTTP/JSON Transport
//!
//! Serves the domain operations as JSON over HTTP.
//!
//! # Endpoints
//!
//! - `POST /sensors` - create a sensor
//! - `GET /sensors/{name}` - fetch a sensor by name
//! - `PUT /sensors/{name}` - replace a sensor, returns rows affected
//! - `GET /sensors/nearest` - nearest sensor to a location
//! - `POST /sensor_readings` - record a reading
//! - `GET /sensor_readings` - readings inside a time window
//! - `GET /status` - liveness text

pub mod adaptor;
mod router;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SensorService;

pub use adaptor::{AdaptorError, RawInput, adapt};
pub use router::create_router;

// =============================================================================
// HTTP Server
// =============================================================================

/// HTTP listener over an already-bound socket.
pub struct HttpServer {
    listener: TcpListener,
    service: SensorService,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a server for `listener`. It stops accepting once `cancel` fires
    /// and returns after in-flight requests finish.
    #[must_use]
    pub const fn new(listener: TcpListener, service: SensorService, cancel: CancellationToken) -> Self {
        Self {
            listener,
            service,
            cancel,
        }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, HttpServerError> {
        self.listener
            .local_addr()
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))
    }

    /// Serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError::ServerFailed` if the serve loop fails.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = create_router(self.service);
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "HTTP server listening");
        }

        axum::serve(self.listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind the listener.
    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// The serve loop failed.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// Bind the HTTP listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, HttpServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| HttpServerError::BindFailed(addr, e.to_string()))
}
