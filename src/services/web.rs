use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::services::Service;
use crate::state::{AppState, ServiceStatus};
use crate::web::create_router;

/// Serves the HTTP API.
pub struct WebService {
    port: u16,
    app_state: AppState,
    shutdown_tx: Option<broadcast::Sender<()>>,
    server: Option<JoinHandle<Result<(), std::io::Error>>>,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self {
            port,
            app_state,
            shutdown_tx: None,
            server: None,
        }
    }
}

#[async_trait::async_trait]
impl Service for WebService {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        info!(
            address = %addr,
            link = format!("http://localhost:{}", self.port),
            "web server listening"
        );

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let router = create_router(self.app_state.clone());
        self.server = Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    trace!("web server received shutdown signal");
                })
                .await
        }));
        self.app_state
            .service_statuses
            .set(self.name(), ServiceStatus::Active);

        if let Some(server) = self.server.as_mut() {
            let result = server.await;
            self.server = None;
            result??;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        } else {
            warn!("no shutdown channel found for web service");
        }
        if let Some(server) = self.server.take() {
            server.await??;
        }
        self.app_state
            .service_statuses
            .set(self.name(), ServiceStatus::Disabled);
        Ok(())
    }
}
