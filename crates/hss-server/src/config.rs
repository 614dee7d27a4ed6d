use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration, loaded from TOML. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Management console listener. Disabled when unset.
    pub console_addr: Option<SocketAddr>,
    /// Request body limit in bytes.
    pub max_upload_size: usize,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9000)),
            console_addr: None,
            max_upload_size: 1024 * 1024 * 1024,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_upload_size == 0 {
            return Err(ServerError::Config(
                "max_upload_size must be greater than zero".into(),
            ));
        }
        if self.store.root.as_os_str().is_empty() {
            return Err(ServerError::Config("store.root must not be empty".into()));
        }
        if self.console_addr == Some(self.bind_addr) {
            return Err(ServerError::Config(format!(
                "console_addr and bind_addr are both {}",
                self.bind_addr
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding all content and sidecars.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/data-store"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive. `RUST_LOG` takes precedence.
    pub level: String,
    /// Also append logs to this file.
    pub log_file: Option<PathBuf>,
    /// Request headers to log. Empty logs every header.
    pub specific_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_file: None,
            specific_headers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_upload_size, 1024 * 1024 * 1024);
        assert_eq!(c.store.root, PathBuf::from("/tmp/data-store"));
        assert_eq!(c.logging.level, "info");
        assert!(c.console_addr.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn full_toml() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:8080"
            console_addr = "127.0.0.1:8081"
            max_upload_size = 4096

            [store]
            root = "/srv/hss"

            [logging]
            level = "debug"
            log_file = "/var/log/hss.log"
            specific_headers = ["content-type", "metadata-fields"]
            "#,
        )
        .unwrap();

        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.console_addr.map(|a| a.port()), Some(8081));
        assert_eq!(c.max_upload_size, 4096);
        assert_eq!(c.store.root, PathBuf::from("/srv/hss"));
        assert_eq!(c.logging.log_file, Some(PathBuf::from("/var/log/hss.log")));
        assert_eq!(c.logging.specific_headers.len(), 2);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml("[store]\nroot = \"/data\"\n").unwrap();
        assert_eq!(c.store.root, PathBuf::from("/data"));
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(c.logging, LoggingConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_toml("max_upload_size = 0").is_err());
        assert!(ServerConfig::from_toml("bind_addr = \"not an address\"").is_err());
        assert!(ServerConfig::from_toml(
            "bind_addr = \"127.0.0.1:9000\"\nconsole_addr = \"127.0.0.1:9000\""
        )
        .is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hss.toml");
        fs::write(&path, "bind_addr = \"127.0.0.1:9100\"\n").unwrap();

        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr.port(), 9100);

        let err = ServerConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
