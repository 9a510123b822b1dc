//! Shared fixtures for the integration tests

use hamster::config::Config;
use hamster::crawler::{ApiClient, PaginatedFetcher};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Creates a configuration pointing at the mock server, with near-zero backoff
pub fn test_config(base_url: &str, num_workers: u32) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_secs = 5;
    config.fetch.num_workers = num_workers;
    config.retry.backoff_base_ms = 1;
    config.retry.max_backoff_ms = 4;
    config
}

pub fn test_fetcher(config: &Config) -> PaginatedFetcher {
    let client = ApiClient::from_config(config, TOKEN).expect("Failed to build client");
    PaginatedFetcher::new(
        client,
        config.api.per_page,
        config.fetch.num_workers as usize,
    )
}

/// Records of one page: ids continue across pages so the merged set is 1..=N
pub fn page_records(page: u32, per_page: u32) -> Value {
    let first = (page - 1) * per_page + 1;
    Value::Array((first..first + per_page).map(|id| json!({"id": id})).collect())
}

pub fn record_ids(records: &[Value]) -> Vec<u64> {
    records
        .iter()
        .map(|r| r["id"].as_u64().expect("record without id"))
        .collect()
}

/// Builds a `Link` header advertising `last` pages of `endpoint`
pub fn link_header(server: &MockServer, endpoint: &str, next: u32, last: u32) -> String {
    let target = |page: u32| format!("<{}{}?per_page=100&page={}>", server.uri(), endpoint, page);
    format!(r#"{}; rel="next", {}; rel="last""#, target(next), target(last))
}

/// Mounts `pages` pages of `per_page` records at `endpoint`
///
/// Earlier pages answer more slowly so workers finish out of page order.
pub async fn mount_pages(server: &MockServer, endpoint: &str, pages: u32, per_page: u32) {
    for page in 2..=pages {
        let delay = std::time::Duration::from_millis(u64::from(pages - page) * 20);
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_records(page, per_page))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    let mut first = ResponseTemplate::new(200).set_body_json(page_records(1, per_page));
    if pages > 1 {
        first = first.insert_header("link", link_header(server, endpoint, 2, pages).as_str());
    }

    // Mounted last so the page-specific mocks take precedence
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(first)
        .mount(server)
        .await;
}
