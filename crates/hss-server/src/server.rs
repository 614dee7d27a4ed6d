use std::sync::Arc;

use hss_store::{DataStore, FsDataStore};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_console_router, build_router};
use crate::state::AppState;

/// HSS storage server.
pub struct HssServer {
    config: Arc<ServerConfig>,
    store: Arc<dyn DataStore>,
}

impl HssServer {
    /// Validate the configuration and open the filesystem store at its root.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = FsDataStore::open(&config.store.root)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Serve an already-opened store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn DataStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn state(&self) -> AppState {
        AppState::new(Arc::clone(&self.store), Arc::clone(&self.config))
    }

    /// Build the API router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state())
    }

    /// Build the management console router.
    pub fn console_router(&self) -> axum::Router {
        build_console_router(self.state())
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            root = %self.config.store.root.display(),
            "HSS server listening"
        );

        if let Some(addr) = self.config.console_addr {
            let console = TcpListener::bind(addr).await?;
            let app = self.console_router();
            info!(%addr, "management console listening");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(console, app).await {
                    error!(error = %e, "management console stopped");
                }
            });
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
