//! File content operations.
//!
//! These functions assume the caller holds the store guard and has already
//! resolved the logical path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::{IoContext, StoreError, StoreResult};
use crate::path::ResolvedPath;
use crate::record::{FileRecord, Metadata};
use crate::sidecar::Sidecar;

/// Create an empty file and its sidecar.
pub(crate) fn start(target: &ResolvedPath, metadata: Metadata) -> StoreResult<FileRecord> {
    let sidecar = Sidecar::for_file(target)?;
    require_parent(target)?;
    if sidecar.exists() || target.absolute().is_dir() {
        return Err(StoreError::already_exists(target.logical()));
    }

    // Truncates orphaned content left behind by an earlier failed delete.
    File::create(target.absolute()).at(target.absolute())?;

    let record = FileRecord::new(target.logical(), metadata);
    sidecar.write(&record)?;
    debug!(path = target.logical(), upload_id = %record.upload_id, "upload started");
    Ok(record)
}

/// Append one part. Parts land in call order; `part_number` is informational.
pub(crate) fn append(target: &ResolvedPath, data: &[u8], part_number: u32) -> StoreResult<FileRecord> {
    let sidecar = Sidecar::for_file(target)?;
    let mut record: FileRecord = sidecar.read()?;

    let path = target.absolute();
    let mut content = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .at(path)?;
    content.write_all(data).at(path)?;

    record.record_append(data.len() as u64);
    sidecar.write(&record)?;
    debug!(
        path = target.logical(),
        part_number,
        len = data.len(),
        size = record.size,
        "part appended"
    );
    Ok(record)
}

pub(crate) fn read(target: &ResolvedPath) -> StoreResult<Vec<u8>> {
    let _record: FileRecord = Sidecar::for_file(target)?.read()?;
    match fs::read(target.absolute()) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = target.logical(), "sidecar present but content is missing");
            Err(StoreError::not_found(target.logical()))
        }
        Err(e) => Err(StoreError::io(target.absolute(), e)),
    }
}

pub(crate) fn record(target: &ResolvedPath) -> StoreResult<FileRecord> {
    Sidecar::for_file(target)?.read()
}

/// Record and content read as one step, so they always describe the same upload.
pub(crate) fn read_with_record(target: &ResolvedPath) -> StoreResult<(FileRecord, Vec<u8>)> {
    let stored = record(target)?;
    let data = read(target)?;
    Ok((stored, data))
}

/// Stamp the digests on the upload identified by `upload_id`.
///
/// A file deleted and started again since that upload began carries a new id
/// and is left untouched.
pub(crate) fn commit(
    target: &ResolvedPath,
    upload_id: Uuid,
    digest: &ContentDigest,
) -> StoreResult<FileRecord> {
    let sidecar = Sidecar::for_file(target)?;
    let mut record: FileRecord = sidecar.read()?;
    if record.upload_id != upload_id {
        return Err(StoreError::InvalidRecord {
            path: target.logical().to_string(),
            reason: format!("upload {upload_id} was replaced by {}", record.upload_id),
        });
    }
    record.apply_digest(digest);
    sidecar.write(&record)?;
    debug!(path = target.logical(), %upload_id, "upload committed");
    Ok(record)
}

/// Overwrite the sidecar. Identity fields and the size stay owned by the store.
pub(crate) fn replace_record(target: &ResolvedPath, record: &FileRecord) -> StoreResult<()> {
    let sidecar = Sidecar::for_file(target)?;
    let stored: FileRecord = sidecar.read()?;

    let reject = |reason: &str| StoreError::InvalidRecord {
        path: target.logical().to_string(),
        reason: reason.to_string(),
    };
    if record.upload_id != stored.upload_id {
        return Err(reject("uploadId cannot change"));
    }
    if record.key != stored.key {
        return Err(reject("key does not match the stored record"));
    }
    if record.size != stored.size {
        return Err(reject("size is maintained by part writes"));
    }

    sidecar.write(record)?;
    debug!(path = target.logical(), "record updated");
    Ok(())
}

/// Remove the sidecar, then the content. A content removal failure after the
/// sidecar is gone leaves an orphan and is not rolled back.
pub(crate) fn delete(target: &ResolvedPath) -> StoreResult<()> {
    let sidecar = Sidecar::for_file(target)?;
    if !sidecar.exists() {
        return Err(StoreError::not_found(target.logical()));
    }
    sidecar.remove()?;

    match fs::remove_file(target.absolute()) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = target.logical(), "content already missing at delete");
        }
        Err(e) => {
            warn!(
                path = target.logical(),
                error = %e,
                "sidecar removed but content could not be deleted; content is orphaned"
            );
            return Err(StoreError::io(target.absolute(), e));
        }
    }
    debug!(path = target.logical(), "file deleted");
    Ok(())
}

fn require_parent(target: &ResolvedPath) -> StoreResult<()> {
    let Some(parent) = target.parent() else {
        return Err(StoreError::invalid_path(
            target.logical(),
            "the store root is not a file",
        ));
    };
    if Sidecar::for_directory(&parent).exists() {
        Ok(())
    } else {
        Err(StoreError::not_found(if parent.is_root() {
            "/"
        } else {
            parent.logical()
        }))
    }
}
