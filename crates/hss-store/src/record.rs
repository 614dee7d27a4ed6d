use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::ContentDigest;

/// User-supplied key/value metadata attached to files and directories.
pub type Metadata = BTreeMap<String, String>;

/// Sidecar record describing a stored file.
///
/// `name` and `key` both carry the normalized logical path. `upload_id` is
/// assigned once by [`FileRecord::new`] and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub key: String,
    pub last_modified: DateTime<Utc>,
    /// Bytes appended so far.
    pub size: u64,
    /// BLAKE3 hex of the full content, once an upload completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// MD5 hex of the full content, once an upload completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    pub upload_id: Uuid,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl FileRecord {
    /// A fresh, empty record with a newly generated upload id.
    pub fn new(key: impl Into<String>, metadata: Metadata) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            last_modified: Utc::now(),
            size: 0,
            checksum: None,
            md5: None,
            upload_id: Uuid::now_v7(),
            metadata,
        }
    }

    /// Account for `len` appended bytes.
    pub fn record_append(&mut self, len: u64) {
        self.size += len;
        self.last_modified = Utc::now();
    }

    pub fn apply_digest(&mut self, digest: &ContentDigest) {
        self.checksum = Some(digest.checksum.clone());
        self.md5 = Some(digest.md5.clone());
        self.last_modified = Utc::now();
    }

    /// Returns `true` once content digests have been recorded.
    pub fn is_committed(&self) -> bool {
        self.checksum.is_some() && self.md5.is_some()
    }
}

/// Sidecar record describing a directory.
///
/// `size` and `files_count` are informational and are not recomputed from
/// the filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub files_count: u64,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub deleted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl DirectoryRecord {
    /// A record for a directory created now. The root is named `/`.
    pub fn new(logical: &str, metadata: Metadata) -> Self {
        let name = if logical.is_empty() {
            "/".to_string()
        } else {
            logical.to_string()
        };
        Self {
            path: name.clone(),
            name,
            size: 0,
            files_count: 0,
            created: Utc::now(),
            deleted: None,
            metadata,
        }
    }
}

/// Kind of a listed directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// One direct child of a listed directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Logical path of the child.
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Filesystem length; 0 for directories.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_record_wire_names() {
        let mut record = FileRecord::new("docs/a.txt", Metadata::new());
        record.record_append(5);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "docs/a.txt");
        assert_eq!(json["key"], "docs/a.txt");
        assert_eq!(json["size"], 5);
        assert!(json.get("lastModified").is_some());
        assert!(json.get("uploadId").is_some());
        // Unset digests and empty metadata are omitted.
        assert!(json.get("md5").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn upload_ids_are_unique() {
        let a = FileRecord::new("a", Metadata::new());
        let b = FileRecord::new("a", Metadata::new());
        assert_ne!(a.upload_id, b.upload_id);
    }

    #[test]
    fn apply_digest_commits_record() {
        let mut record = FileRecord::new("a", Metadata::new());
        assert!(!record.is_committed());
        record.apply_digest(&ContentDigest::of(b"hello"));
        assert!(record.is_committed());
        assert_eq!(
            record.md5.as_deref(),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
    }

    #[test]
    fn file_record_survives_json() {
        let mut metadata = Metadata::new();
        metadata.insert("owner".into(), "alice".into());
        let record = FileRecord::new("x/y", metadata);
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn directory_record_wire_names() {
        let record = DirectoryRecord::new("docs", Metadata::new());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "docs");
        assert_eq!(json["path"], "docs");
        assert_eq!(json["files_count"], 0);
        assert!(json["deleted"].is_null());
        assert!(json.get("created").is_some());
    }

    #[test]
    fn root_directory_is_named_slash() {
        let record = DirectoryRecord::new("", Metadata::new());
        assert_eq!(record.name, "/");
        assert_eq!(record.path, "/");
    }

    #[test]
    fn list_entry_type_field() {
        let entry = ListEntry {
            name: "a.txt".into(),
            kind: EntryKind::File,
            key: "docs/a.txt".into(),
            last_modified: None,
            size: 5,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["key"], "docs/a.txt");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
    }
}
