//! Response classification
//!
//! The upstream API reports several "there is nothing here for you" situations
//! through error statuses, and intermittently answers 500 for resources that
//! exist. Treating every non-2xx as an error would abort whole crawls, so each
//! response is triaged into exactly one `Classification`:
//!
//! | Status | Condition | Classification |
//! |--------|-----------|----------------|
//! | 200 | body parses as JSON | `Success` |
//! | 403 | `x-ratelimit-remaining` > 0 | `EmptySuccess` |
//! | 403 | remaining is 0, absent or unparsable | `FatalRateLimited` |
//! | 404, 500 | - | `EmptySuccess` |
//! | anything else | - | `FatalError` |
//!
//! A 403 with budget left is usually a permissions problem (private
//! repository, blocked organization), so real data can be skipped silently.

use crate::crawler::fetcher::ApiResponse;
use crate::HamsterError;
use reqwest::StatusCode;
use serde_json::Value;

/// Outcome of one HTTP response
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// OK with a parsed payload
    Success(Value),

    /// A benign "nothing here" answer
    EmptySuccess,

    /// The credential has exhausted its request budget
    FatalRateLimited { url: String, body: String },

    /// Any other non-recoverable outcome
    FatalError {
        status: u16,
        url: String,
        body: String,
    },
}

impl Classification {
    /// Converts the classification into the records it contributes
    ///
    /// A sequence payload contributes its elements, a single object
    /// contributes itself, `null` contributes nothing.
    pub fn into_records(self) -> Result<Vec<Value>, HamsterError> {
        match self {
            Self::Success(Value::Array(records)) => Ok(records),
            Self::Success(Value::Null) => Ok(Vec::new()),
            Self::Success(record) => Ok(vec![record]),
            Self::EmptySuccess => Ok(Vec::new()),
            Self::FatalRateLimited { url, body } => Err(HamsterError::RateLimited { url, body }),
            Self::FatalError { status, url, body } => {
                Err(HamsterError::Api { status, url, body })
            }
        }
    }
}

/// Classifies a complete response
///
/// Every call logs the status and URL, whatever the outcome.
pub fn classify(response: &ApiResponse) -> Classification {
    let status = response.status;
    tracing::info!(
        status = status.as_u16(),
        url = %response.url,
        "classified response"
    );

    match status {
        StatusCode::OK => match serde_json::from_slice(&response.body) {
            Ok(payload) => Classification::Success(payload),
            Err(e) => {
                tracing::error!("Invalid JSON body from {}: {}", response.url, e);
                fatal(response)
            }
        },
        StatusCode::FORBIDDEN => match response.rate_limit_remaining() {
            Some(remaining) if remaining > 0 => {
                tracing::debug!(
                    "403 with {} requests remaining for {}, treating as empty",
                    remaining,
                    response.url
                );
                Classification::EmptySuccess
            }
            Some(_) | None => Classification::FatalRateLimited {
                url: response.url.clone(),
                body: response.text(),
            },
        },
        StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR => Classification::EmptySuccess,
        // Untriaged statuses fail closed
        _ => fatal(response),
    }
}

fn fatal(response: &ApiResponse) -> Classification {
    Classification::FatalError {
        status: response.status.as_u16(),
        url: response.url.clone(),
        body: response.text(),
    }
}
