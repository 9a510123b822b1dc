//! HTTP transport implementation
//!
//! This module handles all HTTP requests made by the harvester, including:
//! - Building a shared, connection-pooled client with the fixed request headers
//! - Resolving endpoints against the configured API base URL
//! - Transparent retry with exponential backoff for transient failures
//! - Reading complete responses so they can be classified
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Status in `status-forcelist` (500-504) | Retry with backoff, last response returned when exhausted |
//! | Connection failure | Retry with backoff (when `retry-connect`) |
//! | Timeout | Immediate → `HamsterError::Timeout` |
//! | Any other transport error | Immediate → `HamsterError::Http` |
//! | 4xx and everything else | Returned as-is for classification |

use crate::config::{ApiConfig, Config, RetryConfig};
use crate::{ConfigError, HamsterError};
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use url::Url;

/// Header carrying the remaining request budget of the credential
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Header pinning the REST API version
const API_VERSION_HEADER: &str = "x-github-api-version";

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// Final URL of the request
    pub url: String,

    /// Response headers
    pub headers: HeaderMap,

    /// Raw response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Returns the remaining request budget, if the header is present and numeric
    pub fn rate_limit_remaining(&self) -> Option<u64> {
        self.headers
            .get(RATE_LIMIT_REMAINING)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Returns the body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Retry behavior for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retries: usize,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for a single delay
    pub max_delay: Duration,

    /// Status codes that trigger a retry
    pub status_forcelist: Vec<u16>,

    /// Whether connection failures are retried
    pub retry_connect: bool,
}

impl RetryPolicy {
    /// Returns true if a response with this status should be retried
    pub fn is_transient(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Builds the exponential backoff strategy: base, 2×base, 4×base, ...
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
            status_forcelist: config.status_forcelist.clone(),
            retry_connect: config.retry_connect,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Outcome of one failed attempt
enum AttemptError {
    /// The server answered with a status from the forcelist
    Transient(ApiResponse),

    /// The request never produced a response
    Request(reqwest::Error),
}

/// Builds an HTTP client with the fixed request headers
///
/// Every request carries the Accept header, the bearer credential, the
/// optional API version and the configured user agent. The timeout bounds
/// each individual attempt.
///
/// # Example
///
/// ```no_run
/// use hamster::config::ApiConfig;
/// use hamster::crawler::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default(), "ghp_example").unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig, token: &str) -> Result<Client, HamsterError> {
    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT, header_value(&config.accept, "accept")?);

    let mut auth = header_value(&format!("Bearer {}", token), "API token")?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    if let Some(version) = &config.api_version {
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            header_value(version, "api_version")?,
        );
    }

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.timeout())
        .gzip(true)
        .build()?;

    Ok(client)
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|_| ConfigError::InvalidHeader(format!("{} contains invalid characters", what)))
}

/// Normalizes a base URL so endpoints resolve below it
pub fn parse_base_url(base_url: &str) -> Result<Url, HamsterError> {
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?)
}

/// Shared API transport
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client from an already built `reqwest::Client`
    pub fn new(client: Client, base_url: &str, retry: RetryPolicy) -> Result<Self, HamsterError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            retry,
        })
    }

    /// Creates a client from the configuration and credential
    pub fn from_config(config: &Config, token: &str) -> Result<Self, HamsterError> {
        let client = build_http_client(&config.api, token)?;
        Self::new(client, &config.api.base_url, RetryPolicy::from(&config.retry))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves an endpoint such as `orgs/octo/repos` against the base URL
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, HamsterError> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Performs a GET request, retrying transient failures
    ///
    /// The caller only ever sees the final response: intermediate attempts
    /// that failed with a transient status are logged and discarded. When the
    /// retry budget runs out on a transient status, that last response is
    /// returned for classification.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<ApiResponse, HamsterError> {
        let url = self.endpoint_url(endpoint)?;
        let retry = &self.retry;

        let attempt = || {
            let request = self.client.get(url.clone()).query(params);
            send_once(request, retry)
        };

        let outcome = attempt
            .retry(retry.backoff())
            .when(|err| match err {
                AttemptError::Transient(_) => true,
                AttemptError::Request(e) => retry.retry_connect && e.is_connect(),
            })
            .notify(|err, delay| match err {
                AttemptError::Transient(response) => tracing::warn!(
                    "HTTP {} for {}, retrying in {:?}",
                    response.status.as_u16(),
                    response.url,
                    delay
                ),
                AttemptError::Request(e) => tracing::warn!(
                    "Connection to {} failed ({}), retrying in {:?}",
                    url,
                    e,
                    delay
                ),
            })
            .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(AttemptError::Transient(response)) => {
                tracing::warn!(
                    "Retries exhausted for {} (last status {})",
                    response.url,
                    response.status.as_u16()
                );
                Ok(response)
            }
            Err(AttemptError::Request(e)) if e.is_timeout() => Err(HamsterError::Timeout {
                url: url.to_string(),
            }),
            Err(AttemptError::Request(e)) => Err(HamsterError::Http {
                url: url.to_string(),
                source: e,
            }),
        }
    }
}

/// Sends one attempt and reads the full response
async fn send_once(
    request: RequestBuilder,
    retry: &RetryPolicy,
) -> Result<ApiResponse, AttemptError> {
    let response = request.send().await.map_err(AttemptError::Request)?;
    let response = ApiResponse::read(response)
        .await
        .map_err(AttemptError::Request)?;

    if retry.is_transient(response.status) {
        return Err(AttemptError::Transient(response));
    }

    Ok(response)
}
