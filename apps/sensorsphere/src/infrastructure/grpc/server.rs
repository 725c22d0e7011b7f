//! gRPC Listener
//!
//! Serves [`SensorSphereGrpcService`] behind the middleware chain on an
//! already-bound socket, optionally over TLS.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;
use tower::Layer;

use super::auth::authenticate;
use super::middleware::{ContextTagLayer, GrpcLoggingLayer, GrpcTraceLayer};
use super::proto::sensorsphere::v1::sensor_sphere_service_server::SensorSphereServiceServer;
use super::service::SensorSphereGrpcService;
use crate::infrastructure::tls::TlsConfig;

/// gRPC server errors.
#[derive(Debug, thiserror::Error)]
pub enum GrpcServerError {
    /// Failed to bind the listener.
    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// The TLS material was rejected.
    #[error("invalid TLS configuration: {0}")]
    Tls(String),

    /// The serve loop failed.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// gRPC listener over an already-bound socket.
pub struct GrpcServer {
    listener: TcpListener,
    service: SensorSphereGrpcService,
    builder: Server,
    cancel: CancellationToken,
}

impl std::fmt::Debug for GrpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcServer")
            .field("listener", &self.listener)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl GrpcServer {
    /// Prepare a server. TLS material is validated here, before serving.
    pub fn new(
        listener: TcpListener,
        service: SensorSphereGrpcService,
        tls: Option<&TlsConfig>,
        cancel: CancellationToken,
    ) -> Result<Self, GrpcServerError> {
        let mut builder = Server::builder();
        if let Some(tls) = tls {
            builder = builder
                .tls_config(tls.build_server_config())
                .map_err(|e| GrpcServerError::Tls(e.to_string()))?;
        }

        Ok(Self {
            listener,
            service,
            builder,
            cancel,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GrpcServerError> {
        self.listener
            .local_addr()
            .map_err(|e| GrpcServerError::ServerFailed(e.to_string()))
    }

    /// Serve until cancelled, then drain in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns `GrpcServerError::ServerFailed` if the serve loop fails.
    pub async fn run(self) -> Result<(), GrpcServerError> {
        let Self {
            listener,
            service,
            builder,
            cancel,
        } = self;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "gRPC server listening");
        }

        let service = InterceptedService::new(
            GrpcTraceLayer.layer(SensorSphereServiceServer::new(service)),
            authenticate,
        );

        builder
            .layer(ContextTagLayer)
            .layer(GrpcLoggingLayer)
            .add_service(service)
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                cancel.cancelled_owned(),
            )
            .await
            .map_err(|e| GrpcServerError::ServerFailed(e.to_string()))?;

        tracing::info!("gRPC server stopped");
        Ok(())
    }
}

/// Bind the gRPC listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, GrpcServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GrpcServerError::BindFailed(addr, e.to_string()))
}
