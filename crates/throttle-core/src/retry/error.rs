//! Error values seen by the retry loop: API failures and context termination.

use super::headers::Headers;

/// An HTTP-level failure reported by the API transport.
///
/// Transports and SDK wrappers construct this from a non-success response so
/// the retry loop can read the status code and headers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}: {message}")]
pub struct ApiError {
    status: u16,
    headers: Headers,
    message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            message: message.into(),
        }
    }

    /// Replace the response headers attached to this error.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Append a single response header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why the retry loop stopped waiting: its [`Context`](super::Context) ended,
/// or the shared admission limiter was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The context (or a parent) was cancelled explicitly.
    #[error("context canceled")]
    Canceled,
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// The executor's admission semaphore was closed; no attempt was made.
    #[error("admission limiter closed")]
    LimiterClosed,
}
