//! Logical path resolution.
//!
//! A logical path is the caller-supplied key of a file or directory
//! (`docs/a.txt`). Resolution normalizes it, rejects anything that could
//! address a location outside the store root, and joins it onto the root.
//!
//! Normalization:
//! - Leading, trailing and repeated `/` are ignored
//! - The empty path (and `/`) names the root itself
//!
//! Rejected segments:
//! - `.` and `..`
//! - Segments containing `\` or NUL
//! - Segments starting with `__` (reserved for sidecar metadata)

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{IoContext, StoreError, StoreResult};

/// Name prefix reserved for metadata entries written by the store.
pub const RESERVED_PREFIX: &str = "__";

/// A logical path that passed validation, paired with its on-disk location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    logical: String,
    absolute: PathBuf,
}

impl ResolvedPath {
    /// Normalized logical path; empty for the root.
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Absolute location under the store root.
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    pub fn is_root(&self) -> bool {
        self.logical.is_empty()
    }

    /// Last segment of the logical path. `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        Some(
            self.logical
                .rsplit_once('/')
                .map_or(self.logical.as_str(), |(_, name)| name),
        )
    }

    /// The enclosing directory. `None` for the root.
    pub fn parent(&self) -> Option<ResolvedPath> {
        if self.is_root() {
            return None;
        }
        let logical = self
            .logical
            .rsplit_once('/')
            .map_or("", |(parent, _)| parent)
            .to_string();
        let absolute = self.absolute.parent()?.to_path_buf();
        Some(ResolvedPath { logical, absolute })
    }

    /// This path and all of its ancestors, root first.
    pub fn lineage(&self) -> Vec<ResolvedPath> {
        let mut chain = vec![self.clone()];
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Logical key of a direct child named `name`.
    pub fn child_key(&self, name: &str) -> String {
        if self.is_root() {
            name.to_string()
        } else {
            format!("{}/{}", self.logical, name)
        }
    }
}

/// Maps logical paths onto the filesystem below a fixed root.
#[derive(Clone, Debug)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for an existing root directory.
    ///
    /// The root is canonicalized once; containment checks compare against
    /// the canonical form.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().at(root)?;
        if !canonical.is_dir() {
            return Err(StoreError::io(
                canonical,
                io::Error::new(io::ErrorKind::Other, "store root is not a directory"),
            ));
        }
        Ok(Self { root: canonical })
    }

    /// Canonical store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to a location under the root.
    ///
    /// Never touches the filesystem beyond `stat`/`canonicalize` of
    /// already-existing ancestors.
    pub fn resolve(&self, logical: &str) -> StoreResult<ResolvedPath> {
        let segments = normalize(logical)?;
        let mut absolute = self.root.clone();
        absolute.extend(&segments);
        self.ensure_contained(logical, &absolute)?;
        Ok(ResolvedPath {
            logical: segments.join("/"),
            absolute,
        })
    }

    /// The nearest existing ancestor must canonicalize to somewhere under the
    /// root. This catches symlinks that point out of the store.
    fn ensure_contained(&self, logical: &str, candidate: &Path) -> StoreResult<()> {
        let existing = candidate
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
            .unwrap_or(&self.root);
        let canonical = match existing.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::invalid_path(logical, "dangling symbolic link"));
            }
            Err(e) => return Err(StoreError::io(existing, e)),
        };
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(StoreError::invalid_path(
                logical,
                "resolves outside the store root",
            ))
        }
    }
}

/// Split a logical path into validated segments.
pub fn normalize(logical: &str) -> StoreResult<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in logical.split('/') {
        if segment.is_empty() {
            continue;
        }
        validate_segment(logical, segment)?;
        segments.push(segment);
    }
    Ok(segments)
}

fn validate_segment(logical: &str, segment: &str) -> StoreResult<()> {
    if segment == "." || segment == ".." {
        return Err(StoreError::invalid_path(
            logical,
            "must not contain '.' or '..' segments",
        ));
    }
    if segment.contains('\\') || segment.contains('\0') {
        return Err(StoreError::invalid_path(
            logical,
            "contains a forbidden character",
        ));
    }
    if segment.starts_with(RESERVED_PREFIX) {
        return Err(StoreError::invalid_path(
            logical,
            format!("segments starting with '{RESERVED_PREFIX}' are reserved"),
        ));
    }
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StoreError::invalid_path(logical, "not a plain path segment")),
    }
}
