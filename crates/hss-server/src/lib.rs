//! HTTP server for HSS, the hierarchical storage service.
//!
//! Exposes the storage engine as a REST surface: the request path is the
//! logical path, and `?type=file|directory` selects what it names. A second,
//! optional listener serves the management console.

pub mod config;
pub mod error;
pub mod handler;
pub mod headers;
pub mod logging;
pub mod operation;
pub mod request_log;
pub mod router;
pub mod server;
pub mod state;

pub use config::{LoggingConfig, ServerConfig, StoreConfig};
pub use error::{ServerError, ServerResult};
pub use handler::HealthResponse;
pub use logging::init_logging;
pub use operation::{EntryQuery, Operation};
pub use server::HssServer;
pub use state::AppState;
