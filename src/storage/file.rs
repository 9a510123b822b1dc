//! File system cache store
//!
//! Each entry is one gzip-compressed JSON array below the output directory.
//! Serialization is deterministic: `serde_json` maps keep their keys sorted and
//! the gzip header carries no timestamp, so storing the same records twice
//! produces byte-identical files.

use crate::storage::traits::{CacheStore, StorageError, StorageResult};
use crate::storage::{CacheKey, Sanitizer};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Suffix appended to the last key segment
pub const ENTRY_SUFFIX: &str = ".json.gz";

/// Cache store backed by a directory tree
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    root: PathBuf,
    sanitizer: Sanitizer,
}

impl FileCacheStore {
    /// Creates a store rooted at `root` using the given sanitizer
    ///
    /// The directory does not need to exist yet; it is created on first store.
    pub fn new(root: impl Into<PathBuf>, sanitizer: Sanitizer) -> Self {
        Self {
            root: root.into(),
            sanitizer,
        }
    }

    /// Returns the path an entry is stored at
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        key.to_path(&self.root, ENTRY_SUFFIX)
    }

    /// Encodes records into the compressed on-disk representation
    pub fn encode(&self, records: &[Value]) -> StorageResult<Vec<u8>> {
        let cleaned = self.sanitizer.sanitize_all(records)?;
        let json = serde_json::to_vec(&cleaned)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    /// Decodes the compressed on-disk representation
    fn decode(key: &CacheKey, bytes: &[u8]) -> StorageResult<Vec<Value>> {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| corrupt(key, format!("decompression failed: {}", e)))?;

        serde_json::from_slice(&json).map_err(|e| corrupt(key, format!("invalid JSON: {}", e)))
    }
}

impl CacheStore for FileCacheStore {
    fn exists(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    fn load(&self, key: &CacheKey) -> StorageResult<Vec<Value>> {
        let bytes = fs::read(self.path_for(key))?;
        Self::decode(key, &bytes)
    }

    fn store(&self, key: &CacheKey, records: &[Value]) -> StorageResult<()> {
        let path = self.path_for(key);
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let bytes = self.encode(records)?;

        // Write next to the target so the rename stays on one file system
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!("Stored {} records at {}", records.len(), path.display());
        Ok(())
    }
}

fn corrupt(key: &CacheKey, reason: String) -> StorageError {
    StorageError::Corrupt {
        key: key.to_string(),
        reason,
    }
}
