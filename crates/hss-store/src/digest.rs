use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Content digests recorded on a file after a complete write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest {
    /// MD5 of the content as lowercase hex (served as `Content-MD5`).
    pub md5: String,
    /// BLAKE3 of the content as lowercase hex.
    pub checksum: String,
}

impl ContentDigest {
    /// Digest a complete buffer in one call.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Incremental hasher fed one part at a time during an upload.
#[derive(Clone, Default)]
pub struct ContentHasher {
    md5: Md5,
    blake3: blake3::Hasher,
    len: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.blake3.update(data);
        self.len += data.len() as u64;
    }

    /// Bytes consumed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finalize(self) -> ContentDigest {
        ContentDigest {
            md5: hex::encode(self.md5.finalize()),
            checksum: self.blake3.finalize().to_hex().to_string(),
        }
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").field("len", &self.len).finish()
    }
}
