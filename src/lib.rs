//! Hamster: a resumable bulk harvester for paginated, rate-limited REST APIs
//!
//! This crate collects organizations, repositories, pull requests and pull
//! request timelines from a GitHub-style API. Every response set is sanitized,
//! compressed and cached on disk so an interrupted run picks up where it left off.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Hamster operations
#[derive(Debug, Error)]
pub enum HamsterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rate limit exhausted (403) for {url}: {body}")]
    RateLimited { url: String, body: String },

    #[error("HTTP {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Link header for {url} advertises {last_page} pages, more than {limit}")]
    TooManyPages {
        url: String,
        last_page: u32,
        limit: u32,
    },

    #[error("Query {endpoint} failed on page {page}: {source}")]
    Query {
        endpoint: String,
        page: u32,
        #[source]
        source: Box<HamsterError>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HamsterError {
    /// Wraps an error with the Query and page it occurred on
    pub fn in_query(self, endpoint: &str, page: u32) -> Self {
        match self {
            // Already carries its context
            err @ Self::Query { .. } => err,
            other => Self::Query {
                endpoint: endpoint.to_string(),
                page,
                source: Box::new(other),
            },
        }
    }

    /// Returns true if this error (or the error it wraps) is a rate limit exhaustion
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Query { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Result type alias for Hamster operations
pub type Result<T> = std::result::Result<T, HamsterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{classify, ApiClient, Classification, Coordinator, PaginatedFetcher, Query};
pub use storage::{CacheKey, CacheStore, FileCacheStore, Sanitizer};
