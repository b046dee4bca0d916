//! Scripted stand-in for a rate-limited API used by integration tests.
//!
//! Each call pops the next scripted reply; once the script is exhausted the
//! fallback reply is used forever. Call times are recorded on the tokio clock
//! so paused-time tests can assert exact waits.

use std::collections::VecDeque;
use std::sync::Mutex;

use throttle_core::retry::{ApiError, Classify, ContextError, Headers};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    /// 429 with optional `Retry-After` and throttle-scope header values.
    Throttled {
        retry_after: Option<&'static str>,
        scope: Option<&'static str>,
    },
    /// Any other HTTP status.
    Status(u16),
    /// Failure before the request reached the API.
    Local,
}

impl Reply {
    pub fn throttled_after(secs: &'static str) -> Self {
        Reply::Throttled {
            retry_after: Some(secs),
            scope: None,
        }
    }

    pub fn throttled() -> Self {
        Reply::Throttled {
            retry_after: None,
            scope: None,
        }
    }
}

/// Error type an SDK wrapper would hand back to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not build request: {0}")]
    Build(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl Classify for CallError {
    fn http_status(&self) -> Option<u16> {
        match self {
            CallError::Api(e) => e.http_status(),
            CallError::Build(_) | CallError::Context(_) => None,
        }
    }

    fn http_headers(&self) -> Option<&Headers> {
        match self {
            CallError::Api(e) => e.http_headers(),
            CallError::Build(_) | CallError::Context(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct FakeApi {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    call_times: Mutex<Vec<Instant>>,
}

impl FakeApi {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `reply`.
    pub fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    /// Perform one call; returns the 1-based call number on success.
    pub fn call(&self) -> Result<usize, CallError> {
        let n = {
            let mut times = self.call_times.lock().unwrap();
            times.push(Instant::now());
            times.len()
        };
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Ok => Ok(n),
            Reply::Throttled { retry_after, scope } => {
                let mut err = ApiError::new(429, "Too Many Requests");
                if let Some(v) = retry_after {
                    err = err.with_header("Retry-After", v);
                }
                if let Some(v) = scope {
                    err = err
                        .with_header("x-ms-throttle-scope", v)
                        .with_header("x-ms-throttle-information", "ResourceUnitLimitExceeded");
                }
                Err(err.into())
            }
            Reply::Status(code) => Err(ApiError::new(code, format!("status {code}")).into()),
            Reply::Local => Err(CallError::Build("missing field `id`".to_string())),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_times.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}
