//! Directory operations. Callers hold the store guard.

use std::fs;
use std::io;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{IoContext, StoreError, StoreResult};
use crate::path::ResolvedPath;
use crate::record::{DirectoryRecord, EntryKind, ListEntry, Metadata};
use crate::sidecar::{is_metadata_name, Sidecar};

/// Create `target` and any missing ancestors. Each directory created on the
/// way gets a sidecar of its own.
pub(crate) fn create(target: &ResolvedPath, metadata: Metadata) -> StoreResult<DirectoryRecord> {
    let sidecar = Sidecar::for_directory(target);
    if sidecar.exists() {
        return Err(StoreError::already_exists(target.logical()));
    }
    if !target.is_root()
        && (Sidecar::for_file(target)?.exists() || target.absolute().is_file())
    {
        return Err(StoreError::already_exists(target.logical()));
    }

    let lineage = target.lineage();
    if let Some(blocker) = lineage
        .iter()
        .find(|dir| dir.absolute().exists() && !dir.absolute().is_dir())
    {
        return Err(StoreError::invalid_path(
            target.logical(),
            format!("{} is not a directory", blocker.logical()),
        ));
    }

    for dir in &lineage {
        let path = dir.absolute();
        if !path.is_dir() {
            fs::create_dir(path).at(path)?;
        }
        if dir == target {
            continue;
        }
        let intermediate = Sidecar::for_directory(dir);
        if !intermediate.exists() {
            intermediate.write(&DirectoryRecord::new(dir.logical(), Metadata::new()))?;
            debug!(path = dir.logical(), "intermediate directory registered");
        }
    }

    let record = DirectoryRecord::new(target.logical(), metadata);
    sidecar.write(&record)?;
    debug!(path = target.logical(), "directory created");
    Ok(record)
}

/// Read the sidecar. Statistics are never recomputed from the filesystem.
pub(crate) fn info(target: &ResolvedPath) -> StoreResult<DirectoryRecord> {
    Sidecar::for_directory(target).read()
}

/// Remove the directory and everything below it.
pub(crate) fn delete(target: &ResolvedPath) -> StoreResult<()> {
    if target.is_root() {
        return Err(StoreError::invalid_path(
            target.logical(),
            "the store root cannot be deleted",
        ));
    }
    if !Sidecar::for_directory(target).exists() {
        return Err(StoreError::not_found(target.logical()));
    }
    fs::remove_dir_all(target.absolute()).at(target.absolute())?;
    debug!(path = target.logical(), "directory deleted");
    Ok(())
}

/// Direct children in enumeration order, store metadata excluded.
pub(crate) fn list(target: &ResolvedPath) -> StoreResult<Vec<ListEntry>> {
    if !Sidecar::for_directory(target).exists() {
        return Err(StoreError::not_found(target.logical()));
    }

    let dir = target.absolute();
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!(path = target.logical(), name = ?file_name, "skipping non UTF-8 entry");
            continue;
        };
        if is_metadata_name(name) {
            continue;
        }

        let entry_path = entry.path();
        // A dangling symlink is listed as itself.
        let meta = match fs::metadata(&entry_path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = target.logical(), name, "entry does not resolve; listing the link itself");
                fs::symlink_metadata(&entry_path).at(&entry_path)?
            }
            Err(e) => return Err(StoreError::io(&entry_path, e)),
        };
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(ListEntry {
            name: name.to_string(),
            kind,
            key: target.child_key(name),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            size: if kind == EntryKind::Directory { 0 } else { meta.len() },
        });
    }
    debug!(path = target.logical(), count = entries.len(), "directory listed");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathResolver;

    fn setup() -> (tempfile::TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();
        let root = resolver.resolve("").unwrap();
        Sidecar::for_directory(&root)
            .write(&DirectoryRecord::new("", Metadata::new()))
            .unwrap();
        (dir, resolver)
    }

    fn names(entries: &[ListEntry]) -> Vec<String> {
        let mut names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    #[test]
    fn create_writes_sidecar() {
        let (dir, resolver) = setup();
        let target = resolver.resolve("docs").unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("team".into(), "storage".into());

        let record = create(&target, metadata.clone()).unwrap();
        assert_eq!(record.name, "docs");
        assert!(dir.path().join("docs").join("__info__.json").is_file());
        assert_eq!(info(&target).unwrap().metadata, metadata);
    }

    #[test]
    fn create_twice_is_already_exists() {
        let (_dir, resolver) = setup();
        let target = resolver.resolve("docs").unwrap();
        create(&target, Metadata::new()).unwrap();
        assert!(create(&target, Metadata::new()).unwrap_err().is_already_exists());
    }

    #[test]
    fn create_root_is_already_exists() {
        let (_dir, resolver) = setup();
        let root = resolver.resolve("").unwrap();
        assert!(create(&root, Metadata::new()).unwrap_err().is_already_exists());
    }

    #[test]
    fn create_registers_intermediates() {
        let (_dir, resolver) = setup();
        let target = resolver.resolve("a/b/c").unwrap();
        create(&target, Metadata::new()).unwrap();

        for logical in ["a", "a/b", "a/b/c"] {
            let dir = resolver.resolve(logical).unwrap();
            assert_eq!(info(&dir).unwrap().path, logical);
        }
    }

    #[test]
    fn create_over_file_is_already_exists() {
        let (dir, resolver) = setup();
        fs::write(dir.path().join("plain"), b"x").unwrap();
        let target = resolver.resolve("plain").unwrap();
        assert!(create(&target, Metadata::new()).unwrap_err().is_already_exists());
    }

    #[test]
    fn create_below_file_is_invalid_path() {
        let (dir, resolver) = setup();
        fs::write(dir.path().join("plain"), b"x").unwrap();
        let target = resolver.resolve("plain/sub").unwrap();
        assert!(create(&target, Metadata::new()).unwrap_err().is_invalid_path());
    }

    #[test]
    fn create_adopts_unregistered_directory() {
        let (dir, resolver) = setup();
        fs::create_dir(dir.path().join("raw")).unwrap();
        let target = resolver.resolve("raw").unwrap();
        create(&target, Metadata::new()).unwrap();
        assert!(info(&target).is_ok());
    }

    // -----------------------------------------------------------------------
    // info / delete
    // -----------------------------------------------------------------------

    #[test]
    fn info_without_sidecar_is_not_found() {
        let (dir, resolver) = setup();
        fs::create_dir(dir.path().join("raw")).unwrap();
        let target = resolver.resolve("raw").unwrap();
        assert!(info(&target).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_removes_subtree() {
        let (dir, resolver) = setup();
        let target = resolver.resolve("a").unwrap();
        create(&resolver.resolve("a/b").unwrap(), Metadata::new()).unwrap();
        fs::write(dir.path().join("a").join("b").join("f"), b"x").unwrap();

        delete(&target).unwrap();
        assert!(!dir.path().join("a").exists());
        assert!(info(&target).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_dir, resolver) = setup();
        let target = resolver.resolve("nope").unwrap();
        assert!(delete(&target).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_root_is_invalid_path() {
        let (_dir, resolver) = setup();
        let root = resolver.resolve("").unwrap();
        assert!(delete(&root).unwrap_err().is_invalid_path());
        assert!(info(&root).is_ok());
    }

    // -----------------------------------------------------------------------
    // list
    // -----------------------------------------------------------------------

    #[test]
    fn list_hides_metadata_and_classifies_entries() {
        let (dir, resolver) = setup();
        create(&resolver.resolve("sub").unwrap(), Metadata::new()).unwrap();
        fs::write(dir.path().join("f.txt"), b"12345").unwrap();
        fs::write(dir.path().join("__stray.meta.json"), b"{}").unwrap();

        let root = resolver.resolve("").unwrap();
        let entries = list(&root).unwrap();
        assert_eq!(names(&entries), vec!["f.txt", "sub"]);

        let file = entries.iter().find(|e| e.name == "f.txt").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 5);
        assert_eq!(file.key, "f.txt");
        assert!(file.last_modified.is_some());

        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert_eq!(sub.kind, EntryKind::Directory);
        assert_eq!(sub.size, 0);
    }

    #[test]
    fn list_nested_keys() {
        let (dir, resolver) = setup();
        let docs = resolver.resolve("docs").unwrap();
        create(&docs, Metadata::new()).unwrap();
        fs::write(dir.path().join("docs").join("a.txt"), b"hi").unwrap();

        let entries = list(&docs).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "docs/a.txt");
    }

    #[test]
    fn list_empty_directory() {
        let (_dir, resolver) = setup();
        let docs = resolver.resolve("docs").unwrap();
        create(&docs, Metadata::new()).unwrap();
        assert!(list(&docs).unwrap().is_empty());
    }

    #[test]
    fn list_missing_is_not_found() {
        let (_dir, resolver) = setup();
        let target = resolver.resolve("nope").unwrap();
        assert!(list(&target).unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn list_survives_dangling_symlink() {
        let (dir, resolver) = setup();
        let target = resolver.resolve("").unwrap();
        create(&resolver.resolve("sub").unwrap(), Metadata::new()).unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("broken")).unwrap();

        let entries = list(&target).unwrap();
        assert_eq!(names(&entries), vec!["broken", "sub"]);
        let broken = entries.iter().find(|e| e.name == "broken").unwrap();
        assert_eq!(broken.kind, EntryKind::File);
    }
}
