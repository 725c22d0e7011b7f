//! Service Lifecycle
//!
//! [`Agent`] builds the gateway in a fixed order, runs the HTTP and gRPC
//! listeners on their own tasks and tears everything down exactly once.
//!
//! # Construction
//!
//! 1. Logging and the tracer provider
//! 2. Storage migrations
//! 3. Authorizer
//! 4. TLS material
//! 5. Both listeners
//!
//! Any failure returns before a listener task is spawned.
//!
//! # Teardown
//!
//! gRPC drain, HTTP drain, tracer flush, storage close, on a task of its
//! own. The first failing step ends the sequence and its error is the
//! shutdown result. A listener whose serve loop failed is logged and still
//! drained; its error is not a teardown failure.

use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{AuthorizationError, Authorizer, Database, StorageError};
use crate::application::services::SensorService;
use crate::infrastructure::authz::{AllowAllAuthorizer, CasbinAuthorizer};
use crate::infrastructure::config::AgentConfig;
use crate::infrastructure::grpc::{self, GrpcServer, GrpcServerError, SensorSphereGrpcService};
use crate::infrastructure::http::{self, HttpServer, HttpServerError};
use crate::infrastructure::telemetry::{self, Telemetry, TelemetryError};
use crate::infrastructure::tls::{TlsConfig, TlsError};

// =============================================================================
// Errors
// =============================================================================

/// Failures while constructing the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Logging or the tracer could not be set up.
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Migrations failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The policy could not be loaded.
    #[error("authorization: {0}")]
    Authorization(#[from] AuthorizationError),

    /// TLS material could not be loaded or generated.
    #[error("tls: {0}")]
    Tls(#[from] TlsError),

    /// The HTTP listener could not be bound.
    #[error("http: {0}")]
    Http(#[from] HttpServerError),

    /// The gRPC listener could not be bound or configured.
    #[error("grpc: {0}")]
    Grpc(#[from] GrpcServerError),
}

/// Failure of one teardown step.
///
/// Shared by every caller of [`Agent::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// A listener task panicked or was aborted.
    #[error("listener task: {0}")]
    Join(String),

    /// The tracer could not be flushed.
    #[error("telemetry: {0}")]
    Telemetry(String),

    /// The storage handle could not be closed.
    #[error("storage: {0}")]
    Storage(String),
}

// =============================================================================
// Lifecycle State
// =============================================================================

/// Lifecycle position of an [`Agent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Listeners are being started.
    Initializing,
    /// Both listeners are serving.
    Running,
    /// Teardown is in progress.
    ShuttingDown,
    /// Teardown finished. Terminal.
    Stopped,
}

// =============================================================================
// Agent
// =============================================================================

/// The running gateway.
pub struct Agent {
    node_name: String,
    database: Arc<dyn Database>,
    telemetry: Telemetry,
    http_addr: SocketAddr,
    grpc_addr: SocketAddr,
    http_cancel: CancellationToken,
    grpc_cancel: CancellationToken,
    http_task: Mutex<Option<JoinHandle<()>>>,
    grpc_task: Mutex<Option<JoinHandle<()>>>,
    state: Mutex<LifecycleState>,
    shutdown_signal: CancellationToken,
    outcome: watch::Sender<Option<Result<(), ShutdownError>>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("node_name", &self.node_name)
            .field("http_addr", &self.http_addr)
            .field("grpc_addr", &self.grpc_addr)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Build the gateway and start both listeners.
    ///
    /// # Errors
    ///
    /// Returns the first construction step that fails. No listener task is
    /// running when this returns an error.
    pub async fn start(
        config: AgentConfig,
        database: Arc<dyn Database>,
    ) -> Result<Arc<Self>, AgentError> {
        let telemetry = telemetry::init(&config.telemetry)?;

        database.run_migrations().await?;
        tracing::debug!("migrations applied");

        let authorizer: Arc<dyn Authorizer> = match &config.acl {
            Some(acl) => {
                Arc::new(CasbinAuthorizer::from_files(&acl.model_file, &acl.policy_file).await?)
            }
            None => {
                tracing::warn!("no ACL configured, every caller is allowed");
                Arc::new(AllowAllAuthorizer)
            }
        };

        let tls = TlsConfig::from_settings(&config.tls, &config.node_name)?;

        let sensors = SensorService::new(Arc::clone(&database));
        let http_cancel = CancellationToken::new();
        let grpc_cancel = CancellationToken::new();

        let http_server = HttpServer::new(
            http::bind(config.server.http_addr()).await?,
            sensors.clone(),
            http_cancel.clone(),
        );
        let grpc_server = GrpcServer::new(
            grpc::bind(config.server.grpc_addr()).await?,
            SensorSphereGrpcService::new(sensors, authorizer),
            tls.as_ref(),
            grpc_cancel.clone(),
        )?;
        let http_addr = http_server.local_addr()?;
        let grpc_addr = grpc_server.local_addr()?;

        let agent = Arc::new(Self {
            node_name: config.node_name,
            database,
            telemetry,
            http_addr,
            grpc_addr,
            http_cancel,
            grpc_cancel,
            http_task: Mutex::new(None),
            grpc_task: Mutex::new(None),
            state: Mutex::new(LifecycleState::Initializing),
            shutdown_signal: CancellationToken::new(),
            outcome: watch::Sender::new(None),
        });

        *agent.http_task.lock() = Some(supervise(
            "http",
            http_server.run(),
            Arc::downgrade(&agent),
        ));
        *agent.grpc_task.lock() = Some(supervise(
            "grpc",
            grpc_server.run(),
            Arc::downgrade(&agent),
        ));

        {
            let mut state = agent.state.lock();
            if *state == LifecycleState::Initializing {
                *state = LifecycleState::Running;
            }
        }

        tracing::info!(
            node = %agent.node_name,
            http = %http_addr,
            grpc = %grpc_addr,
            tls = tls.is_some(),
            exporting = agent.telemetry.is_exporting(),
            "agent started"
        );

        Ok(agent)
    }

    /// Bound `(http, grpc)` addresses.
    #[must_use]
    pub const fn local_addrs(&self) -> (SocketAddr, SocketAddr) {
        (self.http_addr, self.grpc_addr)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Resolve once shutdown has started, whoever started it.
    pub async fn wait(&self) {
        self.shutdown_signal.cancelled().await;
    }

    /// Tear the gateway down.
    ///
    /// Safe to call any number of times from any number of tasks. The
    /// sequence runs once on a task of its own, so dropping a caller does not
    /// interrupt it, and every caller receives its result.
    pub async fn shutdown(self: &Arc<Self>) -> Result<(), ShutdownError> {
        let mut outcome = self.outcome.subscribe();

        let first = {
            let mut state = self.state.lock();
            match *state {
                LifecycleState::Initializing | LifecycleState::Running => {
                    *state = LifecycleState::ShuttingDown;
                    self.shutdown_signal.cancel();
                    true
                }
                LifecycleState::ShuttingDown | LifecycleState::Stopped => false,
            }
        };
        if first {
            let agent = Arc::clone(self);
            tokio::spawn(async move {
                let result = agent.teardown().await;
                agent.outcome.send_replace(Some(result));
            });
        }

        outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|e| ShutdownError::Join(e.to_string()))?
            .clone()
            .unwrap_or(Ok(()))
    }

    async fn teardown(&self) -> Result<(), ShutdownError> {
        tracing::info!(node = %self.node_name, "shutting down");

        let result = self.stop_in_order().await;
        *self.state.lock() = LifecycleState::Stopped;

        match &result {
            Ok(()) => tracing::info!("shutdown complete"),
            Err(e) => tracing::error!(error = %e, "shutdown aborted"),
        }
        result
    }

    async fn stop_in_order(&self) -> Result<(), ShutdownError> {
        self.grpc_cancel.cancel();
        let grpc_task = self.grpc_task.lock().take();
        if let Some(task) = grpc_task {
            task.await.map_err(|e| ShutdownError::Join(e.to_string()))?;
        }

        self.http_cancel.cancel();
        let http_task = self.http_task.lock().take();
        if let Some(task) = http_task {
            task.await.map_err(|e| ShutdownError::Join(e.to_string()))?;
        }

        self.telemetry
            .shutdown()
            .await
            .map_err(|e| ShutdownError::Telemetry(e.to_string()))?;

        self.database
            .close()
            .await
            .map_err(|e| ShutdownError::Storage(e.to_string()))
    }
}

/// Run a listener's serve loop. A serve error is logged and starts the
/// shared shutdown; the task itself always finishes cleanly.
fn supervise<E: Display + Send + 'static>(
    listener: &'static str,
    serve: impl Future<Output = Result<(), E>> + Send + 'static,
    agent: Weak<Agent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve.await {
            tracing::error!(listener, error = %e, "listener failed");
            trigger_shutdown(&agent);
        }
    })
}

/// Start teardown on its own task so a failing listener never awaits itself.
fn trigger_shutdown(agent: &Weak<Agent>) {
    if let Some(agent) = agent.upgrade() {
        tokio::spawn(async move {
            let _ = agent.shutdown().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use crate::application::ports::MockDatabase;
    use crate::infrastructure::persistence::InMemoryDatabase;

    fn local_config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.server.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.server.http_port = 0;
        config.server.grpc_port = 0;
        config
    }

    fn healthy_db() -> MockDatabase {
        let mut db = MockDatabase::new();
        db.expect_run_migrations().times(1).returning(|| Ok(()));
        db
    }

    #[tokio::test]
    async fn ephemeral_ports_are_resolved() {
        let agent = Agent::start(local_config(), Arc::new(InMemoryDatabase::new()))
            .await
            .unwrap();
        let (http, grpc) = agent.local_addrs();

        assert_ne!(http.port(), 0);
        assert_ne!(grpc.port(), 0);
        assert_ne!(http.port(), grpc.port());
        assert_eq!(agent.state(), LifecycleState::Running);

        agent.shutdown().await.unwrap();
        assert_eq!(agent.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn concurrent_shutdowns_close_storage_once() {
        let mut db = healthy_db();
        db.expect_close().times(1).returning(|| Ok(()));
        let agent = Agent::start(local_config(), Arc::new(db)).await.unwrap();

        let (first, second, third) =
            tokio::join!(agent.shutdown(), agent.shutdown(), agent.shutdown());

        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(third, Ok(()));
    }

    #[tokio::test]
    async fn teardown_error_is_returned_to_every_caller() {
        let mut db = healthy_db();
        db.expect_close()
            .times(1)
            .returning(|| Err(StorageError::Backend("disk gone".to_string())));
        let agent = Agent::start(local_config(), Arc::new(db)).await.unwrap();

        let first = agent.shutdown().await;
        let second = agent.shutdown().await;

        assert_eq!(first, Err(ShutdownError::Storage("disk gone".to_string())));
        assert_eq!(second, first);
        assert_eq!(agent.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn failed_listener_still_closes_storage() {
        let database = Arc::new(InMemoryDatabase::new());
        let agent = Agent::start(local_config(), Arc::clone(&database) as Arc<dyn Database>)
            .await
            .unwrap();
        let (http_addr, _) = agent.local_addrs();

        agent.grpc_cancel.cancel();
        let serving = agent.grpc_task.lock().take().unwrap();
        serving.await.unwrap();
        *agent.grpc_task.lock() = Some(supervise(
            "grpc",
            async { Err::<(), _>(GrpcServerError::ServerFailed("accept loop died".to_string())) },
            Arc::downgrade(&agent),
        ));

        assert_eq!(agent.shutdown().await, Ok(()));
        assert_eq!(agent.state(), LifecycleState::Stopped);
        assert!(database.is_closed());
        assert!(agent.http_cancel.is_cancelled());
        assert!(agent.http_task.lock().is_none());
        tokio::net::TcpListener::bind(http_addr).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_shutdown_still_completes_once() {
        let mut db = healthy_db();
        db.expect_close().times(1).returning(|| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let agent = Agent::start(local_config(), Arc::new(db)).await.unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(1), agent.shutdown()).await;
        assert!(abandoned.is_err());

        let result = tokio::time::timeout(Duration::from_secs(5), agent.shutdown()).await;
        assert_eq!(result, Ok(Ok(())));
        assert_eq!(agent.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn waiters_are_released_by_shutdown() {
        let agent = Agent::start(local_config(), Arc::new(InMemoryDatabase::new()))
            .await
            .unwrap();
        let waiter = {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.wait().await })
        };

        agent.shutdown().await.unwrap();

        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn migration_failure_aborts_construction() {
        let mut db = MockDatabase::new();
        db.expect_run_migrations()
            .times(1)
            .returning(|| Err(StorageError::Migration("bad schema".to_string())));
        db.expect_close().times(0);

        let err = Agent::start(local_config(), Arc::new(db)).await.unwrap_err();

        assert!(matches!(err, AgentError::Storage(StorageError::Migration(_))));
    }

    #[tokio::test]
    async fn incomplete_tls_material_aborts_construction() {
        let mut config = local_config();
        config.tls.enabled = true;
        config.tls.cert_path = Some("/nonexistent/cert.pem".into());

        let err = Agent::start(config, Arc::new(healthy_db()))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Tls(_)));
    }

    #[tokio::test]
    async fn occupied_port_aborts_construction() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = local_config();
        config.server.http_port = taken.local_addr().unwrap().port();

        let err = Agent::start(config, Arc::new(healthy_db()))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Http(HttpServerError::BindFailed(..))));
    }
}
