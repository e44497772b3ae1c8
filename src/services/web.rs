use super::Service;
use crate::state::AppState;
use crate::web::create_router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, trace, warn};

/// Web server service implementation
pub struct WebService {
    port: u16,
    app_state: AppState,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self {
            port,
            app_state,
            shutdown_tx: None,
        }
    }

    /// Periodically deletes expired admin sessions from the store and sweeps
    /// the in-memory cache.
    async fn session_cleanup_loop(state: AppState, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = state.clock.now();
                    match state.session_cache.cleanup_expired(now).await {
                        Ok(deleted) => {
                            if deleted > 0 {
                                info!(deleted, "cleaned up expired sessions");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "session cleanup failed");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Service for WebService {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let app = create_router(self.app_state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr).await?;
        info!(
            service = "web",
            address = %addr,
            link = format!("http://localhost:{}", addr.port()),
            "web server listening"
        );

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        let cleanup_state = self.app_state.clone();
        let cleanup_shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            Self::session_cleanup_loop(cleanup_state, cleanup_shutdown_rx).await;
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                trace!(
                    service = "web",
                    "received shutdown signal, starting graceful shutdown"
                );
            })
            .await?;

        trace!(service = "web", "graceful shutdown completed");
        info!(service = "web", "web server stopped");

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
            trace!(service = "web", "sent shutdown signal to axum");
        } else {
            warn!(
                service = "web",
                "no shutdown channel found, cannot trigger graceful shutdown"
            );
        }
        Ok(())
    }
}
