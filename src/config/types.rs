use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Hamster
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults used against the public GitHub API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub crawl: CrawlConfig,
}

/// Upstream API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value of the Accept header
    pub accept: String,

    /// Optional value of the X-GitHub-Api-Version header
    #[serde(rename = "api-version")]
    pub api_version: Option<String>,

    /// User-Agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Timeout for a single request attempt (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Page size requested from paginated endpoints
    #[serde(rename = "per-page")]
    pub per_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com/".to_string(),
            accept: "application/vnd.github+json".to_string(),
            api_version: None,
            user_agent: "collect 1.0".to_string(),
            timeout_secs: 120,
            per_page: 100,
        }
    }
}

impl ApiConfig {
    /// Returns the per-attempt request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Concurrency configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of requests in flight at once within one Query
    #[serde(rename = "num-workers")]
    pub num_workers: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { num_workers: 1 }
    }
}

/// Retry policy for transient server failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: usize,

    /// Delay before the first retry (milliseconds); doubled on every retry
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Status codes that trigger a retry
    #[serde(rename = "status-forcelist")]
    pub status_forcelist: Vec<u16>,

    /// Whether connection failures are retried as well
    #[serde(rename = "retry-connect")]
    pub retry_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_ms: 2000,
            max_backoff_ms: 120_000,
            status_forcelist: vec![500, 501, 502, 503, 504],
            retry_connect: true,
        }
    }
}

/// Cache and sanitization configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether existing cache entries are reused
    pub enabled: bool,

    /// Keys containing any of these substrings are dropped before persisting
    #[serde(rename = "sanitize-contains")]
    pub sanitize_contains: Vec<String>,

    /// Keys equal to any of these names are dropped before persisting
    #[serde(rename = "sanitize-equals")]
    pub sanitize_equals: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sanitize_contains: ["url", "gravatar"].map(String::from).to_vec(),
            sanitize_equals: [
                "body",
                "href",
                "node_id",
                "head",
                "base",
                "_links",
                "title",
                "description",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Crawl sequencing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Repositories (`owner/name`) whose pull requests are never collected
    #[serde(rename = "skip-repos")]
    pub skip_repos: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            skip_repos: vec!["guardrail/guardrail-tingle-tests".to_string()],
        }
    }
}
