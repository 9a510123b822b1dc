//! Paginated fetch engine
//!
//! A Query is fetched in two phases:
//! 1. Page 1 is requested on its own. Its `Link` header tells how many pages exist.
//! 2. Pages 2..=N are requested through the bounded worker pool and merged
//!    back in page order.
//!
//! Endpoints that only advertise `rel="next"` are walked one page at a time.
//! A fatal classification on any page fails the whole Query; no partial
//! result set is ever returned.

use crate::crawler::classify::classify;
use crate::crawler::fetcher::ApiClient;
use crate::crawler::pagination::LinkPagination;
use crate::crawler::query::Query;
use crate::crawler::scheduler::run_ordered;
use crate::HamsterError;
use serde_json::Value;
use std::sync::Arc;

/// Most pages a single Query may span
pub const MAX_PAGES: u32 = 10_000;

/// One classified page
struct Page {
    records: Vec<Value>,
    links: LinkPagination,
    url: String,
}

/// Fetches complete result sets for paginated Queries
#[derive(Debug, Clone)]
pub struct PaginatedFetcher {
    client: Arc<ApiClient>,
    per_page: u32,
    concurrency: usize,
}

impl PaginatedFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - Shared transport used for every page
    /// * `per_page` - Page size added to Queries that do not set `per_page`
    /// * `concurrency` - Default number of pages in flight at once
    pub fn new(client: ApiClient, per_page: u32, concurrency: usize) -> Self {
        Self {
            client: Arc::new(client),
            per_page,
            concurrency: concurrency.max(1),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches every page of a Query with the default concurrency
    pub async fn fetch(&self, query: &Query) -> Result<Vec<Value>, HamsterError> {
        self.fetch_with_concurrency(query, self.concurrency).await
    }

    /// Fetches every page of a Query with at most `concurrency_limit` pages in flight
    ///
    /// A limit of 1 fetches pages strictly one after another and yields the
    /// same result set as any higher limit.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Value>)` - All records of pages 1..=N in page order
    /// * `Err(HamsterError::Query)` - A page failed; carries the endpoint and page number
    pub async fn fetch_with_concurrency(
        &self,
        query: &Query,
        concurrency_limit: usize,
    ) -> Result<Vec<Value>, HamsterError> {
        let query = query.clone().param_or("per_page", self.per_page);
        let endpoint = query.endpoint().to_string();

        let first = fetch_page(&self.client, &query, 1).await?;
        if first.records.is_empty() || !first.links.has_more() {
            tracing::debug!("{}: single page, {} records", endpoint, first.records.len());
            return Ok(first.records);
        }

        let advertised = first.links.last_page;
        let last_page = match advertised {
            Some(last) if last > 1 => last,
            _ => return follow_next(&self.client, &query, first).await,
        };
        check_page_bound(&first.url, last_page).map_err(|e| e.in_query(&endpoint, 1))?;

        tracing::debug!(
            "{}: fetching pages 2..={} with {} workers",
            endpoint,
            last_page,
            concurrency_limit
        );

        let mut records = first.records;
        let query = Arc::new(query);
        let pages: Vec<u32> = (2..=last_page).collect();
        let rest = run_ordered(pages, concurrency_limit, |page| {
            let client = Arc::clone(&self.client);
            let query = Arc::clone(&query);
            async move {
                fetch_page(&client, &query, page)
                    .await
                    .map(|fetched| fetched.records)
            }
        })
        .await?;

        for page_records in rest {
            records.extend(page_records);
        }

        tracing::info!(
            "{}: {} records from {} pages",
            endpoint,
            records.len(),
            last_page
        );
        Ok(records)
    }
}

/// Walks `rel="next"` links one page at a time
///
/// Stops at the first page without a next link, at an empty page, or when a
/// next link does not advance.
async fn follow_next(
    client: &ApiClient,
    query: &Query,
    first: Page,
) -> Result<Vec<Value>, HamsterError> {
    let mut records = first.records;
    let mut current = 1;
    let mut links = first.links;
    let mut url = first.url;

    while let Some(page) = links.next_page {
        if page <= current {
            tracing::warn!("{}: next link points back to page {}", url, page);
            break;
        }
        check_page_bound(&url, page).map_err(|e| e.in_query(query.endpoint(), current))?;

        let fetched = fetch_page(client, query, page).await?;
        if fetched.records.is_empty() {
            break;
        }
        records.extend(fetched.records);
        current = page;
        links = fetched.links;
        url = fetched.url;
    }

    tracing::info!(
        "{}: {} records from {} pages",
        query.endpoint(),
        records.len(),
        current
    );
    Ok(records)
}

/// Rejects `Link` headers that advertise an implausible page count
fn check_page_bound(url: &str, last_page: u32) -> Result<(), HamsterError> {
    if last_page > MAX_PAGES {
        return Err(HamsterError::TooManyPages {
            url: url.to_string(),
            last_page,
            limit: MAX_PAGES,
        });
    }
    Ok(())
}

/// Fetches and classifies one page
async fn fetch_page(client: &ApiClient, query: &Query, page: u32) -> Result<Page, HamsterError> {
    let response = client
        .get(query.endpoint(), &query.page_params(page))
        .await
        .map_err(|e| e.in_query(query.endpoint(), page))?;

    let links = LinkPagination::from_headers(&response.headers);
    let records = classify(&response)
        .into_records()
        .map_err(|e| e.in_query(query.endpoint(), page))?;

    Ok(Page {
        records,
        links,
        url: response.url,
    })
}
