//! HTTP listener shared by the mock services
//!
//! Binds an ephemeral port, serves the router in a background task and
//! shuts it down gracefully on request or when dropped.

use crate::common::{Error, Result, ServiceKind, ServiceState};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Body of every mock's `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
}

/// `GET /health` route reporting `kind`
pub fn health_router(kind: ServiceKind) -> Router {
    Router::new().route(
        "/health",
        get(move || async move {
            Json(HealthResponse {
                service: kind.to_string(),
                status: "ok".to_string(),
            })
        }),
    )
}

pub struct MockServer {
    kind: ServiceKind,
    state: ServiceState,
    addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl MockServer {
    pub fn new(kind: ServiceKind, shutdown_timeout: Duration) -> Self {
        Self {
            kind,
            state: ServiceState::Created,
            addr: None,
            shutdown_tx: None,
            handle: None,
            shutdown_timeout,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Bind `bind_host:0` and start serving `router`
    pub async fn start(&mut self, bind_host: &str, router: Router) -> Result<SocketAddr> {
        if !self.state.can_start() {
            return Err(Error::AlreadyRunning(self.kind.to_string()));
        }

        let listener = match TcpListener::bind((bind_host, 0)).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state = ServiceState::Failed;
                return Err(Error::ServiceStart {
                    service: self.kind.to_string(),
                    reason: format!("bind {}: {}", bind_host, e),
                });
            }
        };
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let kind = self.kind;
        let app = router.layer(TraceLayer::new_for_http());
        let handle = tokio::spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = res {
                tracing::error!("{} server error: {}", kind, e);
            }
        });

        self.addr = Some(addr);
        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        self.state = ServiceState::Running;

        tracing::info!("✓ {} mock listening on {}", self.kind, addr);
        Ok(addr)
    }

    /// Signal shutdown and wait (bounded) for the server task to finish
    pub async fn stop(&mut self) -> Result<()> {
        if !self.state.is_running() {
            tracing::debug!("{} mock not running ({}), nothing to stop", self.kind, self.state);
            return Ok(());
        }

        self.state = ServiceState::Stopped;
        let addr = self.addr.take();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(Error::Internal(format!(
                        "{} server task failed: {}",
                        self.kind, e
                    )))
                }
                Err(_) => {
                    handle.abort();
                    return Err(Error::Timeout(format!(
                        "{} did not shut down within {:?}",
                        self.kind, self.shutdown_timeout
                    )));
                }
            }
        }

        if let Some(addr) = addr {
            tracing::info!("{} mock on {} stopped", self.kind, addr);
        }
        Ok(())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        health_router(ServiceKind::StorageDevice)
    }

    #[tokio::test]
    async fn test_start_stop() {
        let mut server = MockServer::new(ServiceKind::StorageDevice, Duration::from_secs(5));
        assert_eq!(server.state(), ServiceState::Created);

        let addr = server.start("127.0.0.1", router()).await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
        assert!(server.state().is_running());

        let health: HealthResponse = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.service, "storage device");
        assert_eq!(health.status, "ok");

        server.stop().await.unwrap();
        assert_eq!(server.state(), ServiceState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let mut server = MockServer::new(ServiceKind::Directory, Duration::from_secs(5));
        server.start("127.0.0.1", router()).await.unwrap();

        let result = server.start("127.0.0.1", router()).await;
        assert!(matches!(result, Err(Error::AlreadyRunning(_))));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut server = MockServer::new(ServiceKind::MetadataCatalog, Duration::from_secs(5));
        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert_eq!(server.state(), ServiceState::Created);
    }

    #[tokio::test]
    async fn test_bind_failure_marks_failed() {
        let mut server = MockServer::new(ServiceKind::Directory, Duration::from_secs(5));
        let result = server.start("192.0.2.1", router()).await;
        assert!(matches!(result, Err(Error::ServiceStart { .. })));
        assert_eq!(server.state(), ServiceState::Failed);
    }
}
