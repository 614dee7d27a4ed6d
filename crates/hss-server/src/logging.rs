use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ServerError, ServerResult};

/// Install the global subscriber: stdout, plus an optional log file.
///
/// Keep the returned guard alive for as long as file logging should flush.
pub fn init_logging(config: &LoggingConfig) -> ServerResult<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| ServerError::Config(format!("logging already initialized: {e}")))?;
    Ok(guard)
}

fn level_filter(level: &str) -> ServerResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| ServerError::Config(format!("invalid log level {level:?}: {e}")))
}

fn file_appender(path: &Path) -> ServerResult<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ServerError::Config(format!("invalid log file {}", path.display())))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| ServerError::Config(format!("cannot open log file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directives() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("hss_server=debug,tower_http=warn").is_ok());
    }

    #[test]
    fn rejects_garbage_level() {
        assert!(level_filter("hss_server=loud").is_err());
    }

    #[test]
    fn opens_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("hss.log");
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        assert!(file_appender(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn log_file_needs_a_name() {
        assert!(file_appender(Path::new("/")).is_err());
    }
}
