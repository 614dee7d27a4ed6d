//! Sidecar metadata files.
//!
//! Every file and directory in the store has exactly one JSON sidecar. A file
//! `docs/a.txt` is described by `docs/__a.txt.meta.json`; a directory `docs`
//! by `docs/__info__.json`. All names carrying the reserved `__` prefix are
//! internal and never surface in listings.
//!
//! Writes go to a temporary `__tmp*` file in the same directory and are
//! renamed over the target, so a reader never observes half-written JSON.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IoContext, StoreError, StoreResult};
use crate::path::{ResolvedPath, RESERVED_PREFIX};

/// Fixed sidecar name inside every directory.
pub const DIRECTORY_SIDECAR: &str = "__info__.json";

/// Suffix of file sidecars (`__<name>.meta.json`).
pub const FILE_SIDECAR_SUFFIX: &str = ".meta.json";

const TEMP_PREFIX: &str = "__tmp";

/// Returns `true` for directory entries owned by the store itself.
pub fn is_metadata_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Location of the sidecar record for one logical path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sidecar {
    path: PathBuf,
    key: String,
}

impl Sidecar {
    /// Sidecar of the file at `target`, colocated in its parent directory.
    pub fn for_file(target: &ResolvedPath) -> StoreResult<Self> {
        let (Some(name), Some(parent)) = (target.name(), target.absolute().parent()) else {
            return Err(StoreError::invalid_path(
                target.logical(),
                "the store root is not a file",
            ));
        };
        Ok(Self {
            path: parent.join(format!("{RESERVED_PREFIX}{name}{FILE_SIDECAR_SUFFIX}")),
            key: target.logical().to_string(),
        })
    }

    /// Sidecar of the directory at `target`, stored inside it.
    pub fn for_directory(target: &ResolvedPath) -> Self {
        Self {
            path: target.absolute().join(DIRECTORY_SIDECAR),
            key: target.logical().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Decode the record. A missing sidecar means the entity does not exist.
    pub fn read<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound || !self.exists() => {
                return Err(StoreError::not_found(&self.key));
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        serde_json::from_slice(&data).map_err(|e| StoreError::CorruptMetadata {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the record atomically.
    pub fn write<T: Serialize>(&self, record: &T) -> StoreResult<()> {
        let Some(dir) = self.path.parent() else {
            return Err(StoreError::io(
                &self.path,
                io::Error::new(io::ErrorKind::Other, "sidecar has no parent directory"),
            ));
        };
        let json = serde_json::to_vec_pretty(record).map_err(|e| StoreError::io(&self.path, e.into()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)
            .at(dir)?;
        tmp.write_all(&json).at(tmp.path())?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }

    pub fn remove(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(&self.key)),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}
