use std::sync::Arc;

use hss_store::{DataStore, StoreResult};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DataStore>,
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, config: Arc<ServerConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run a store call on the blocking pool.
    ///
    /// The call runs to completion even if the request that issued it is
    /// dropped.
    pub async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        F: FnOnce(&dyn DataStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref())).await?;
        Ok(result?)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_addr", &self.config.bind_addr)
            .finish_non_exhaustive()
    }
}
