//! Storage traits and error types
//!
//! This module defines the trait interface for cache backends and
//! associated error types.

use crate::storage::CacheKey;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt cache entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),

    #[error("Record nesting exceeds depth limit of {0}")]
    TooDeep(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Returns true if the entry exists but could not be read back
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for key-addressable result set stores
///
/// Entries are write-once truth: nothing expires, and a stored entry is
/// returned as-is until the caller overwrites it. Implementations must be
/// safe to share between worker tasks.
pub trait CacheStore: Send + Sync {
    /// Checks whether an entry exists for the key
    fn exists(&self, key: &CacheKey) -> bool;

    /// Loads the records stored under the key
    ///
    /// Fails with `StorageError::Corrupt` when the blob cannot be
    /// decompressed or parsed.
    fn load(&self, key: &CacheKey) -> StorageResult<Vec<Value>>;

    /// Sanitizes and stores the records under the key, replacing any
    /// previous entry
    fn store(&self, key: &CacheKey, records: &[Value]) -> StorageResult<()>;
}
