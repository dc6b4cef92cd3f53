//! Router construction and the HTTP server lifecycle.
//!
//! The server stops accepting connections as soon as the shutdown future
//! resolves, then lets in-flight requests finish for at most the configured
//! grace period.

use std::future::{Future, IntoFuture};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::handler::{handle_hook, HookState};

/// Port the server binds when none is configured.
pub const DEFAULT_PORT: u16 = 80;

/// Grace period for in-flight requests when none is configured.
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Listener and shutdown settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port, bound on all IPv4 interfaces.
    pub port: u16,
    /// How long in-flight requests may run after shutdown is requested.
    pub shutdown_grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Builds the webhook router. The hook answers `/` for every method so that
/// refusing non-`POST` requests stays the handler's decision.
pub fn router(state: HookState) -> Router {
    Router::new().route("/", any(handle_hook)).with_state(state)
}

/// Binds the configured port and serves `app` until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(addr = %addr, "synthesis webhook listening");
    serve_on(listener, app, shutdown, config.shutdown_grace_period).await
}

/// Serves `app` on an already-bound listener.
///
/// Returns once every connection has drained, or once `grace_period` has
/// elapsed after `shutdown` resolved, whichever comes first.
pub async fn serve_on<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace_period: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (requested_tx, requested_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown requested, draining in-flight requests");
            let _ = requested_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(ServerError::Serve),
        _ = requested_rx => {}
    }

    match tokio::time::timeout(grace_period, server).await {
        Ok(result) => {
            info!("all requests drained");
            result.map_err(ServerError::Serve)
        }
        Err(_) => {
            warn!(
                grace_period_secs = grace_period.as_secs(),
                "grace period elapsed with requests still in flight"
            );
            Ok(())
        }
    }
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!(signal = "SIGINT", "received shutdown signal"),
        _ = terminate => info!(signal = "SIGTERM", "received shutdown signal"),
    }
}
