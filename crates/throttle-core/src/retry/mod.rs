//! Reactive retry for rate-limited API calls.
//!
//! An operation is retried only when it fails with HTTP 429. The wait comes
//! from the server's `Retry-After` when present, otherwise from a jittered
//! exponential backoff taken from a named [`RetryPolicy`]. Everything else
//! (success, other statuses, non-API errors) is returned to the caller
//! unchanged. The loop has no attempt cap; callers bound it with a
//! [`Context`] deadline or cancellation.

mod backoff;
mod classify;
mod context;
mod error;
mod event;
mod headers;
mod policy;
mod run;
mod scope;

pub use backoff::{backoff_ceiling, Backoff};
pub use classify::{
    classify, classify_http_status, parse_retry_after, Classify, ErrorKind, ErrorSignal,
    TOO_MANY_REQUESTS,
};
pub use context::Context;
pub use error::{ApiError, ContextError};
pub use event::RetryEvent;
pub use headers::{Headers, RETRY_AFTER, THROTTLE_INFORMATION, THROTTLE_SCOPE};
pub use policy::{
    PolicyName, PolicyTable, QuotaWindow, RetryPolicy, UnknownPolicy, BULK_ASSIGNMENT, GENERAL,
    TENANT_READ, TENANT_WRITE,
};
pub use run::{execute, execute_with, Executor, RetryObserver};
pub use scope::ThrottleScope;
