//! Crawler module for harvesting paginated API result sets
//!
//! This module contains the core harvesting logic, including:
//! - HTTP transport with retry logic
//! - Response classification and `Link` header pagination
//! - Bounded, order-preserving concurrent page fetching
//! - Overall crawl coordination across the four stages

mod classify;
mod coordinator;
mod engine;
mod fetcher;
mod pagination;
mod query;
mod scheduler;

pub use classify::{classify, Classification};
pub use coordinator::{Coordinator, PullRef, RepoRef};
pub use engine::PaginatedFetcher;
pub use fetcher::{
    build_http_client, parse_base_url, ApiClient, ApiResponse, RetryPolicy, RATE_LIMIT_REMAINING,
};
pub use pagination::{parse_link_header, LinkPagination};
pub use query::Query;
pub use scheduler::run_ordered;

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::HamsterError;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client from the configuration
/// 2. Open the cache below `out_dir`
/// 3. Run the organization, repository, pull request and timeline stages
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `token` - API credential
/// * `out_dir` - Cache root directory
/// * `organization` - Restrict the crawl to this organization
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed successfully
/// * `Err(HamsterError)` - Crawl failed
pub async fn crawl(
    config: Config,
    token: &str,
    out_dir: &Path,
    organization: Option<&str>,
) -> Result<CrawlStatistics, HamsterError> {
    let mut coordinator = Coordinator::new(config, token, out_dir)?;
    coordinator.run(organization).await
}
