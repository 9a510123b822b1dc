//! Field removal applied to result sets before they are persisted
//!
//! Harvested records carry a lot of volume that changes between runs without
//! carrying information (hypermedia links, avatar URLs, free-text bodies).
//! The sanitizer drops those keys wherever they occur in the tree.

use crate::config::CacheConfig;
use crate::storage::{StorageError, StorageResult};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Deepest nesting the sanitizer will walk into
///
/// `serde_json` refuses to parse documents nested deeper than 128 levels, so
/// any tree that came off the wire is well within this bound.
pub const MAX_DEPTH: usize = 256;

/// Denylist-based key remover
#[derive(Debug, Clone)]
pub struct Sanitizer {
    /// A key is dropped if it contains any of these substrings
    contains: Vec<String>,

    /// A key is dropped if it equals any of these names
    equals: HashSet<String>,

    max_depth: usize,
}

impl Sanitizer {
    /// Creates a sanitizer from explicit denylists
    pub fn new<C, E>(contains: C, equals: E) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            contains: contains.into_iter().map(Into::into).collect(),
            equals: equals.into_iter().map(Into::into).collect(),
            max_depth: MAX_DEPTH,
        }
    }

    /// Creates a sanitizer from the cache configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.sanitize_contains.iter().cloned(),
            config.sanitize_equals.iter().cloned(),
        )
    }

    /// Overrides the recursion depth cap
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns true if a mapping entry with this key is dropped
    pub fn is_denied(&self, key: &str) -> bool {
        self.equals.contains(key) || self.contains.iter().any(|s| key.contains(s.as_str()))
    }

    /// Returns a copy of the tree with every denied mapping entry removed
    ///
    /// Mappings and sequences are walked recursively; scalars pass through.
    pub fn sanitize(&self, tree: &Value) -> StorageResult<Value> {
        self.sanitize_at(tree, 0)
    }

    /// Sanitizes every record of a result set
    pub fn sanitize_all(&self, records: &[Value]) -> StorageResult<Vec<Value>> {
        records.iter().map(|r| self.sanitize(r)).collect()
    }

    fn sanitize_at(&self, tree: &Value, depth: usize) -> StorageResult<Value> {
        if depth > self.max_depth {
            return Err(StorageError::TooDeep(self.max_depth));
        }

        match tree {
            Value::Object(map) => {
                let mut cleaned = Map::new();
                for (key, value) in map {
                    if self.is_denied(key) {
                        continue;
                    }
                    cleaned.insert(key.clone(), self.sanitize_at(value, depth + 1)?);
                }
                Ok(Value::Object(cleaned))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.sanitize_at(item, depth + 1))
                .collect::<StorageResult<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }
}

impl Default for Sanitizer {
    /// The denylist used by the crawl
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
