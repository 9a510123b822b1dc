//! Transport and paginated fetch tests

use crate::common::{link_header, mount_pages, page_records, record_ids, test_config, test_fetcher};
use hamster::crawler::Query;
use hamster::HamsterError;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pages_merged_in_order_for_any_concurrency() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, "/orgs/octo/repos", 5, 3).await;

    let expected: Vec<u64> = (1..=15).collect();
    let query = Query::new("orgs/octo/repos").param("type", "all");

    for workers in [1, 4, 8] {
        let fetcher = test_fetcher(&test_config(&mock_server.uri(), workers));
        let records = fetcher.fetch(&query).await.expect("Fetch failed");
        assert_eq!(record_ids(&records), expected, "{} workers", workers);
    }
}

#[tokio::test]
async fn test_fetch_with_concurrency_overrides_default() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, "/organizations", 4, 2).await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let query = Query::new("organizations");

    let sequential = fetcher.fetch_with_concurrency(&query, 1).await.unwrap();
    let parallel = fetcher.fetch_with_concurrency(&query, 3).await.unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(record_ids(&parallel), (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_single_page_without_link_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/pulls"))
        .and(query_param("per_page", "100"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_records(1, 2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 4));
    let query = Query::new("repos/octo/hello/pulls").param("state", "all");
    let records = fetcher.fetch(&query).await.unwrap();

    assert_eq!(record_ids(&records), vec![1, 2]);
}

#[tokio::test]
async fn test_empty_first_page_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_records(2, 2)))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header(
                    "link",
                    link_header(&mock_server, "/organizations", 2, 3).as_str(),
                ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 2));
    let records = fetcher.fetch(&Query::new("organizations")).await.unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fatal_page_fails_whole_query() {
    let mock_server = MockServer::start().await;

    for page in [4, 5] {
        Mock::given(method("GET"))
            .and(path("/orgs/octo/repos"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_records(page, 2)))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/orgs/octo/repos"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orgs/octo/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_records(2, 2)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orgs/octo/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_records(1, 2))
                .insert_header(
                    "link",
                    link_header(&mock_server, "/orgs/octo/repos", 2, 5).as_str(),
                ),
        )
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let result = fetcher.fetch(&Query::new("orgs/octo/repos")).await;

    match result {
        Err(HamsterError::Query {
            endpoint,
            page,
            source,
        }) => {
            assert_eq!(endpoint, "orgs/octo/repos");
            assert_eq!(page, 3);
            match *source {
                HamsterError::Api { status, body, .. } => {
                    assert_eq!(status, 422);
                    assert_eq!(body, "Validation Failed");
                }
                other => panic!("expected Api error, got {:?}", other),
            }
        }
        other => panic!("expected Query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "octo"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let records = fetcher.fetch(&Query::new("organizations")).await.unwrap();

    assert_eq!(records, vec![json!({"login": "octo"})]);
}

#[tokio::test]
async fn test_exhausted_retries_on_500_yield_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri(), 1);
    config.retry.max_retries = 2;
    let records = test_fetcher(&config)
        .fetch(&Query::new("organizations"))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_on_502_are_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri(), 1);
    config.retry.max_retries = 1;
    let err = test_fetcher(&config)
        .fetch(&Query::new("organizations"))
        .await
        .unwrap_err();

    match err {
        HamsterError::Query { page: 1, source, .. } => {
            assert!(matches!(*source, HamsterError::Api { status: 502, .. }));
        }
        other => panic!("expected Query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_exhaustion_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_string("API rate limit exceeded"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let err = fetcher
        .fetch(&Query::new("organizations"))
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("organizations"));
}

#[tokio::test]
async fn test_forbidden_with_budget_left_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/secret/pulls"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "4999"))
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let records = fetcher
        .fetch(&Query::new("repos/octo/secret/pulls"))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_not_found_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/gone/repos"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 1));
    let records = fetcher
        .fetch(&Query::new("orgs/gone/repos"))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_request_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("user-agent", "collect 1.0"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri(), 1);
    config.api.api_version = Some("2022-11-28".to_string());
    let records = test_fetcher(&config)
        .fetch(&Query::new("organizations"))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_timeout_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri(), 1);
    config.api.timeout_secs = 1;
    let err = test_fetcher(&config)
        .fetch(&Query::new("organizations"))
        .await
        .unwrap_err();

    match err {
        HamsterError::Query { source, .. } => {
            assert!(matches!(*source, HamsterError::Timeout { .. }));
        }
        other => panic!("expected Query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_implausible_page_count_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_records(1, 2))
                .insert_header(
                    "link",
                    link_header(&mock_server, "/organizations", 2, u32::MAX).as_str(),
                ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 4));
    let err = fetcher
        .fetch(&Query::new("organizations"))
        .await
        .unwrap_err();

    match err {
        HamsterError::Query { page: 1, source, .. } => {
            assert!(matches!(
                *source,
                HamsterError::TooManyPages {
                    last_page: u32::MAX,
                    ..
                }
            ));
        }
        other => panic!("expected Query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_next_links_are_followed_without_last() {
    let mock_server = MockServer::start().await;
    let endpoint = "/repos/octo/hello/issues/9/timeline";
    let next = |page: u32| {
        format!(
            r#"<{}{}?page={}>; rel="next""#,
            mock_server.uri(),
            endpoint,
            page
        )
    };

    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_records(3, 2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_records(2, 2))
                .insert_header("link", next(3).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_records(1, 2))
                .insert_header("link", next(2).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(&test_config(&mock_server.uri(), 4));
    let records = fetcher
        .fetch(&Query::new("repos/octo/hello/issues/9/timeline"))
        .await
        .unwrap();

    assert_eq!(record_ids(&records), (1..=6).collect::<Vec<_>>());
}
