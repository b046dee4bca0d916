//! Turn an operation's error into a normalized [`ErrorSignal`].

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use super::error::{ApiError, ContextError};
use super::headers::{Headers, RETRY_AFTER, THROTTLE_INFORMATION, THROTTLE_SCOPE};
use super::scope::ThrottleScope;

/// HTTP 429 Too Many Requests.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Errors that may carry an HTTP response.
///
/// Return `None` from [`http_status`](Classify::http_status) for failures
/// that never reached the API (request construction, local I/O); the retry
/// loop propagates those immediately.
pub trait Classify {
    fn http_status(&self) -> Option<u16>;

    fn http_headers(&self) -> Option<&Headers> {
        None
    }
}

impl Classify for ApiError {
    fn http_status(&self) -> Option<u16> {
        Some(self.status())
    }

    fn http_headers(&self) -> Option<&Headers> {
        Some(self.headers())
    }
}

impl Classify for ContextError {
    fn http_status(&self) -> Option<u16> {
        None
    }
}

impl Classify for anyhow::Error {
    fn http_status(&self) -> Option<u16> {
        find_api_error(self.chain()).map(ApiError::status)
    }

    fn http_headers(&self) -> Option<&Headers> {
        find_api_error(self.chain()).map(ApiError::headers)
    }
}

impl Classify for Box<dyn StdError + Send + Sync> {
    fn http_status(&self) -> Option<u16> {
        find_api_error(chain(&**self)).map(ApiError::status)
    }

    fn http_headers(&self) -> Option<&Headers> {
        find_api_error(chain(&**self)).map(ApiError::headers)
    }
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn find_api_error<'a>(
    mut errors: impl Iterator<Item = &'a (dyn StdError + 'static)>,
) -> Option<&'a ApiError> {
    errors.find_map(|e| e.downcast_ref::<ApiError>())
}

/// Coarse classification of an HTTP status for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (429). The only retryable kind.
    Throttled,
    /// Any other status; returned to the caller untouched.
    Other,
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        TOO_MANY_REQUESTS => ErrorKind::Throttled,
        _ => ErrorKind::Other,
    }
}

/// Normalized view of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSignal {
    pub status_code: u16,
    pub headers: Headers,
    /// Server-provided wait, if a usable `Retry-After` was present.
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl ErrorSignal {
    pub fn kind(&self) -> ErrorKind {
        classify_http_status(self.status_code)
    }

    pub fn is_throttled(&self) -> bool {
        self.kind() == ErrorKind::Throttled
    }

    /// Parsed throttle-scope header, when present and well formed.
    pub fn throttle_scope(&self) -> Option<ThrottleScope> {
        self.headers
            .get(THROTTLE_SCOPE)
            .map(ThrottleScope::parse)
            .filter(|s| !s.is_empty())
    }

    /// Free-text throttle information header, when present and non-blank.
    pub fn throttle_information(&self) -> Option<&str> {
        self.headers
            .get(THROTTLE_INFORMATION)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Build an [`ErrorSignal`] from an error, or `None` if it carries no HTTP status.
pub fn classify<E>(err: &E) -> Option<ErrorSignal>
where
    E: Classify + fmt::Display + ?Sized,
{
    let status_code = err.http_status()?;
    let headers = err.http_headers().cloned().unwrap_or_default();
    let retry_after = headers.get(RETRY_AFTER).and_then(parse_retry_after);
    Some(ErrorSignal {
        status_code,
        headers,
        retry_after,
        message: err.to_string(),
    })
}

/// Parse a `Retry-After` value expressed in seconds.
///
/// Whole and fractional non-negative seconds are accepted. HTTP-date forms,
/// negative numbers and garbage yield `None` (no override).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let secs = value.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
