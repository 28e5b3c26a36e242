//! Serves the HTTP channel's routes.
//!
//! The channel only defines routes; this binds the listener and owns the
//! server task so it can be stopped with the rest of the session.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::ChannelError;

/// A running axum server.
pub struct ChatServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ChatServer {
    /// Bind `addr` and start serving `routes` in the background.
    pub async fn start(addr: SocketAddr, routes: Router) -> Result<Self, ChannelError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "http".to_string(),
                reason: format!("Failed to bind to {}: {}", addr, e),
            })?;
        let addr = listener.local_addr()?;

        let app = routes.layer(TraceLayer::new_for_http());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("HTTP server shutting down");
                })
                .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });

        tracing::info!("HTTP server listening on {}", addr);

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// The bound address. Differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
