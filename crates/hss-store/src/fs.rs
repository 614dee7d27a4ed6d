use std::fs;
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::directory;
use crate::error::{IoContext, StoreResult};
use crate::file;
use crate::guard::ConcurrencyGuard;
use crate::path::{PathResolver, ResolvedPath};
use crate::record::{DirectoryRecord, FileRecord, ListEntry, Metadata};
use crate::sidecar::Sidecar;
use crate::traits::DataStore;

/// Filesystem-backed store rooted at one directory.
///
/// Each operation resolves its logical path, then runs under the store-wide
/// [`ConcurrencyGuard`].
pub struct FsDataStore {
    resolver: PathResolver,
    guard: ConcurrencyGuard,
}

impl FsDataStore {
    /// Open a store, creating the root directory and its record if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).at(root)?;
        let store = Self {
            resolver: PathResolver::new(root)?,
            guard: ConcurrencyGuard::new(),
        };
        store.init()?;
        info!(root = %store.root().display(), "data store opened");
        Ok(store)
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Write the root's record if it is missing.
    fn init(&self) -> StoreResult<()> {
        self.locked("", |root| {
            let sidecar = Sidecar::for_directory(root);
            if !sidecar.exists() {
                sidecar.write(&DirectoryRecord::new(root.logical(), Metadata::new()))?;
                debug!("root directory registered");
            }
            Ok(())
        })
    }

    fn locked<T>(
        &self,
        path: &str,
        op: impl FnOnce(&ResolvedPath) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let target = self.resolver.resolve(path)?;
        let _held = self.guard.acquire();
        op(&target)
    }
}

impl DataStore for FsDataStore {
    fn start_upload(&self, path: &str, metadata: Metadata) -> StoreResult<FileRecord> {
        self.locked(path, |target| file::start(target, metadata))
    }

    fn write_part(&self, path: &str, data: &[u8], part_number: u32) -> StoreResult<FileRecord> {
        self.locked(path, |target| file::append(target, data, part_number))
    }

    fn read_file(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.locked(path, file::read)
    }

    fn file_record(&self, path: &str) -> StoreResult<FileRecord> {
        self.locked(path, file::record)
    }

    fn read_file_with_record(&self, path: &str) -> StoreResult<(FileRecord, Vec<u8>)> {
        self.locked(path, file::read_with_record)
    }

    fn update_record(&self, path: &str, record: &FileRecord) -> StoreResult<()> {
        self.locked(path, |target| file::replace_record(target, record))
    }

    fn finish_upload(
        &self,
        path: &str,
        upload_id: Uuid,
        digest: &ContentDigest,
    ) -> StoreResult<FileRecord> {
        self.locked(path, |target| file::commit(target, upload_id, digest))
    }

    fn delete_file(&self, path: &str) -> StoreResult<()> {
        self.locked(path, file::delete)
    }

    fn create_directory(&self, path: &str, metadata: Metadata) -> StoreResult<DirectoryRecord> {
        self.locked(path, |target| directory::create(target, metadata))
    }

    fn get_directory_info(&self, path: &str) -> StoreResult<DirectoryRecord> {
        self.locked(path, directory::info)
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        self.locked(path, directory::delete)
    }

    fn list_directory(&self, path: &str) -> StoreResult<Vec<ListEntry>> {
        self.locked(path, directory::list)
    }
}

impl std::fmt::Debug for FsDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDataStore")
            .field("root", &self.root())
            .finish()
    }
}
