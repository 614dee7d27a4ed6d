use std::io;
use std::path::{Path, PathBuf};

/// Errors from storage engine operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The logical path is malformed or escapes the store root.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// No sidecar record exists for the logical path.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// A record already exists where a new one was requested.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// I/O error from the underlying filesystem.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A sidecar exists but its content cannot be decoded.
    #[error("corrupt metadata in {}: {reason}", path.display())]
    CorruptMetadata { path: PathBuf, reason: String },

    /// A record handed to the store violates a record invariant.
    #[error("invalid record for {path}: {reason}")]
    InvalidRecord { path: String, reason: String },
}

impl StoreError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`StoreError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` for [`StoreError::InvalidPath`].
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Attaches the on-disk path to a raw `io::Result`.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> StoreResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> StoreResult<T> {
        self.map_err(|e| StoreError::io(path, e))
    }
}
