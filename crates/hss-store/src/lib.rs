//! Filesystem storage engine for HSS, the hierarchical storage service.
//!
//! Files and directories are addressed by logical paths (`docs/a.txt`) and
//! stored under a single root directory. Next to every file and directory
//! lives a JSON sidecar record describing it; the sidecar, not the raw
//! filesystem entry, is what makes an entity exist.
//!
//! # Components
//!
//! - [`PathResolver`] -- maps logical paths to on-disk paths and rejects
//!   anything that would escape the root
//! - [`Sidecar`] -- reads and atomically replaces metadata records
//! - [`ConcurrencyGuard`] -- one lock per store instance serializing every
//!   operation
//! - [`FsDataStore`] -- the [`DataStore`] implementation tying them together
//!
//! # Design Rules
//!
//! 1. Without a sidecar an entity does not exist, whatever is on disk.
//! 2. File content only grows by appending parts in call order.
//! 3. A file's upload id is assigned once and never changes.
//! 4. Store metadata never appears in listings.
//! 5. Path validation happens before any filesystem access.
//! 6. Failures are reported, never rolled back or retried.

mod directory;
mod file;

pub mod digest;
pub mod error;
pub mod fs;
pub mod guard;
pub mod path;
pub mod record;
pub mod sidecar;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use digest::{ContentDigest, ContentHasher};
pub use error::{StoreError, StoreResult};
pub use fs::FsDataStore;
pub use guard::ConcurrencyGuard;
pub use path::{PathResolver, ResolvedPath};
pub use record::{DirectoryRecord, EntryKind, FileRecord, ListEntry, Metadata};
pub use sidecar::{is_metadata_name, Sidecar};
pub use traits::DataStore;
