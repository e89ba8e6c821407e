/// Classification of throttled Spotify responses
use super::{SessionError, TransientFailure};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::time::Duration;

/// Back-off used when a 429 arrives without a Retry-After header
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    /// Throttled; wait this long before the next request
    Limited(Duration),
    NotRateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed Retry-After header: {value:?}")]
pub struct RetryAfterError {
    pub value: String,
}

/// Decide whether `error` is an upstream rate limit and how long to back off.
pub fn classify(error: &SessionError) -> Result<RateLimit, RetryAfterError> {
    let SessionError::Transient(TransientFailure::Http {
        status, headers, ..
    }) = error
    else {
        return Ok(RateLimit::NotRateLimited);
    };

    if *status != StatusCode::TOO_MANY_REQUESTS {
        return Ok(RateLimit::NotRateLimited);
    }

    let Some(value) = headers.get(RETRY_AFTER) else {
        return Ok(RateLimit::Limited(DEFAULT_RETRY_AFTER));
    };

    let raw = value.to_str().map_err(|_| RetryAfterError {
        value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
    })?;
    let seconds: u64 = raw.trim().parse().map_err(|_| RetryAfterError {
        value: raw.to_string(),
    })?;

    Ok(RateLimit::Limited(Duration::from_secs(seconds)))
}
