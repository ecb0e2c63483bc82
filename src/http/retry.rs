//! When a failed download is worth another attempt.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Default number of attempts for a download.
pub const MAX_RETRIES: usize = 3;

/// Default pause between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How many times a request is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn with_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// HTTP failures that another attempt will not fix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NonRetryableError {
    #[error("HTTP 404: release asset does not exist")]
    NotFound,

    #[error("HTTP {}: access to the release asset was denied", .0.as_u16())]
    Denied(StatusCode),

    #[error("HTTP 429: rate limit exceeded, try again later")]
    RateLimited,

    #[error("HTTP {}: request rejected", .0.as_u16())]
    Rejected(StatusCode),

    #[error("response body is larger than the {limit}-byte limit")]
    TooLarge { limit: usize },
}

/// `None` for statuses worth retrying (5xx), otherwise why not.
pub fn classify_status(status: StatusCode) -> Option<NonRetryableError> {
    match status {
        StatusCode::NOT_FOUND => Some(NonRetryableError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(NonRetryableError::Denied(status)),
        StatusCode::TOO_MANY_REQUESTS => Some(NonRetryableError::RateLimited),
        s if s.is_client_error() => Some(NonRetryableError::Rejected(s)),
        _ => None,
    }
}

/// Wrap an error from `error_for_status()`, tagging it non-retryable when
/// its status says so. Errors without a status (connect, timeout) stay
/// retryable.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match error.status().and_then(classify_status) {
        Some(non_retryable) => anyhow::Error::from(non_retryable),
        None => anyhow::Error::from(error),
    }
}
