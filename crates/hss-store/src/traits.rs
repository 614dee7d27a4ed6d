use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::StoreResult;
use crate::record::{DirectoryRecord, FileRecord, ListEntry, Metadata};

/// Hierarchical file and directory store addressed by logical paths.
///
/// All implementations must satisfy these invariants:
/// - Every existing file and directory has exactly one metadata record.
///   Without a record the entity does not exist, whatever is on disk.
/// - A file's `size` only grows, through `write_part`.
/// - A file's `upload_id` is fixed at `start_upload` and never changes.
/// - Listings never expose the store's own metadata entries.
/// - Operations on one store instance never run concurrently.
/// - A logical path that would escape the store root fails with
///   `InvalidPath` before anything is touched.
pub trait DataStore: Send + Sync {
    /// Create an empty file. The parent directory must exist.
    fn start_upload(&self, path: &str, metadata: Metadata) -> StoreResult<FileRecord>;

    /// Append one part to an open file and return the updated record.
    ///
    /// Parts are appended in call order; `part_number` does not reorder them.
    fn write_part(&self, path: &str, data: &[u8], part_number: u32) -> StoreResult<FileRecord>;

    /// Read the full content of a file.
    fn read_file(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Read a file's metadata record.
    fn file_record(&self, path: &str) -> StoreResult<FileRecord>;

    /// Read a file's record and content as one operation.
    fn read_file_with_record(&self, path: &str) -> StoreResult<(FileRecord, Vec<u8>)>;

    /// Replace a file's metadata record.
    ///
    /// Fails with `InvalidRecord` if the record's `upload_id`, `key` or
    /// `size` differ from the stored one.
    fn update_record(&self, path: &str, record: &FileRecord) -> StoreResult<()>;

    /// Delete a file's record and content.
    fn delete_file(&self, path: &str) -> StoreResult<()>;

    /// Create a directory, including missing ancestors.
    fn create_directory(&self, path: &str, metadata: Metadata) -> StoreResult<DirectoryRecord>;

    /// Read a directory's metadata record.
    fn get_directory_info(&self, path: &str) -> StoreResult<DirectoryRecord>;

    /// Recursively delete a directory. Irreversible.
    fn delete_directory(&self, path: &str) -> StoreResult<()>;

    /// List the direct children of a directory.
    fn list_directory(&self, path: &str) -> StoreResult<Vec<ListEntry>>;

    /// Check whether a file record exists.
    fn file_exists(&self, path: &str) -> StoreResult<bool> {
        match self.file_record(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check whether a directory record exists.
    fn directory_exists(&self, path: &str) -> StoreResult<bool> {
        match self.get_directory_info(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Record the content digests once all parts of upload `upload_id` are
    /// written.
    ///
    /// Fails with `InvalidRecord` if the file at `path` now belongs to a
    /// different upload.
    fn finish_upload(
        &self,
        path: &str,
        upload_id: Uuid,
        digest: &ContentDigest,
    ) -> StoreResult<FileRecord>;
}
