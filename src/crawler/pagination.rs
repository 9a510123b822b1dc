//! Pagination discovery from the `Link` response header
//!
//! GitHub-style APIs expose pagination as
//! `<https://api.github.com/organizations?per_page=100&page=2>; rel="next", <...&page=9>; rel="last"`.

use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Page numbers advertised by a `Link` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link)
    pub last_page: Option<u32>,

    /// The next page number (from rel="next" link)
    pub next_page: Option<u32>,
}

impl LinkPagination {
    /// Extracts pagination info from response headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default()
    }

    /// Returns true if more pages follow the current one
    pub fn has_more(&self) -> bool {
        self.next_page.is_some() || self.last_page.is_some_and(|last| last > 1)
    }
}

/// Parses a `Link` header into the pages it references
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut target = None;
        let mut rel = None;

        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                target = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }

        let (Some(target), Some(rel)) = (target, rel) else {
            continue;
        };

        let Some(page) = page_from_url(target) else {
            continue;
        };

        // rel may hold several space-separated relation types
        for rel_type in rel.split_whitespace() {
            match rel_type {
                "last" => info.last_page = Some(page),
                "next" => info.next_page = Some(page),
                _ => {}
            }
        }
    }

    info
}

/// Extracts the `page` query parameter from a URL
fn page_from_url(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    let page = url
        .query_pairs()
        .find(|(name, _)| *name == "page")
        .and_then(|(_, value)| value.parse().ok());
    page
}
