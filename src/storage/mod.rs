//! Storage module for persisting harvested result sets
//!
//! This module handles the on-disk cache that makes a crawl resumable:
//! - Opaque cache keys mapped to file paths
//! - Field sanitization before persisting
//! - Compressed, deterministic serialization
//! - Atomic replacement of entries

mod file;
mod sanitize;
mod traits;

pub use file::FileCacheStore;
pub use sanitize::{Sanitizer, MAX_DEPTH};
pub use traits::{CacheStore, StorageError, StorageResult};

use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of one cache entry
///
/// A key is a `/`-separated list of segments such as
/// `repos/octo/hello/pulls`. Segments come from API data (organization and
/// repository names), so they are checked to never escape the cache root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from its segments
    ///
    /// # Returns
    ///
    /// * `Ok(CacheKey)` - All segments are valid path components
    /// * `Err(StorageError::InvalidKey)` - A segment is empty, `.`, `..`, or contains a separator
    pub fn new<I, S>(segments: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        if segments.is_empty() {
            return Err(StorageError::InvalidKey(String::new()));
        }

        let joined = segments.join("/");
        for segment in &segments {
            if !is_valid_segment(segment) {
                return Err(StorageError::InvalidKey(joined));
            }
        }

        Ok(Self(joined))
    }

    /// Key of the organization listing
    pub fn organizations() -> Self {
        Self("organizations".to_string())
    }

    /// Key of an organization's repository listing
    pub fn org_repos(org: &str) -> StorageResult<Self> {
        Self::new(["orgs", org, "repos"])
    }

    /// Key of a repository's pull request listing
    pub fn pulls(owner: &str, name: &str) -> StorageResult<Self> {
        Self::new(["repos", owner, name, "pulls"])
    }

    /// Key of a pull request's timeline
    pub fn timeline(owner: &str, name: &str, number: u64) -> StorageResult<Self> {
        Self::new(["repos", owner, name, "timelines", &number.to_string()])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps the key to a path below `root` with the given file suffix
    pub fn to_path(&self, root: &Path, suffix: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        let mut segments = self.0.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{}{}", segment, suffix));
            }
        }
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}
