//! Integration tests for Hamster
//!
//! These tests run the transport, the paginated fetch engine and the full
//! crawl against wiremock servers.

mod common;
mod fetch_tests;
