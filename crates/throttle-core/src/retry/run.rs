//! Retry loop: run an operation until it succeeds, fails with something other
//! than 429, or the caller's context ends.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::backoff::Backoff;
use super::classify::{classify, Classify};
use super::context::Context;
use super::error::ContextError;
use super::event::RetryEvent;
use super::policy::{RetryPolicy, GENERAL};

/// Callback invoked with every retry decision, after it is logged.
pub type RetryObserver = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Parameterized retry loop.
///
/// Each call to [`execute`](Executor::execute) has its own attempt counter and
/// random source; an `Executor` can be shared freely between tasks.
#[derive(Clone)]
pub struct Executor {
    policy: RetryPolicy,
    admission: Option<Arc<Semaphore>>,
    observer: Option<RetryObserver>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("policy", &self.policy.label())
            .field("admission", &self.admission.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(GENERAL)
    }
}

impl Executor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            admission: None,
            observer: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Share a limiter between executors. A permit is held only while the
    /// operation runs, never across a backoff wait.
    pub fn with_admission(mut self, limiter: Arc<Semaphore>) -> Self {
        self.admission = Some(limiter);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Run `op`, waiting out 429 responses.
    ///
    /// Success and every non-429 error (including errors that carry no HTTP
    /// status) are returned as-is on the attempt that produced them. On 429
    /// the loop waits for the server's `Retry-After`, or a jittered
    /// exponential backoff, and tries again. There is no attempt limit: the
    /// only other exits are `ctx` finishing while the loop waits, and a closed
    /// admission limiter. Both yield `E::from(ContextError)`.
    ///
    /// `op` may run many times and must be safe to repeat. Synchronous calls
    /// can be wrapped as `|| std::future::ready(call())`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        ctx: &Context,
        label: &str,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display + From<ContextError>,
    {
        let mut backoff = Backoff::from_clock();
        let mut attempt: u32 = 0;

        loop {
            let permit = self.admit(ctx, label).await.map_err(E::from)?;
            let result = op().await;
            drop(permit);

            let err = match result {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            operation = label,
                            retries = attempt,
                            "succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let Some(signal) = classify(&err) else {
                tracing::debug!(operation = label, error = %err, "non-API error, not retrying");
                return Err(err);
            };
            if !signal.is_throttled() {
                tracing::debug!(
                    operation = label,
                    status = signal.status_code,
                    "non-retryable status"
                );
                return Err(err);
            }

            let delay = backoff.compute_delay(attempt, &self.policy, signal.retry_after);
            attempt = attempt.saturating_add(1);
            let event = RetryEvent::new(label, &self.policy, attempt, delay, &signal);
            event.emit();
            if let Some(observer) = &self.observer {
                observer(&event);
            }

            tokio::select! {
                biased;
                reason = ctx.done() => {
                    tracing::debug!(operation = label, attempt, %reason, "wait interrupted");
                    return Err(E::from(reason));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn admit(
        &self,
        ctx: &Context,
        label: &str,
    ) -> Result<Option<OwnedSemaphorePermit>, ContextError> {
        let Some(limiter) = &self.admission else {
            return Ok(None);
        };
        tokio::select! {
            biased;
            reason = ctx.done() => Err(reason),
            permit = Arc::clone(limiter).acquire_owned() => match permit {
                Ok(permit) => Ok(Some(permit)),
                Err(_) => {
                    tracing::warn!(operation = label, "admission limiter closed, not calling");
                    Err(ContextError::LimiterClosed)
                }
            },
        }
    }
}

/// Run `op` under the general policy. See [`Executor::execute`].
pub async fn execute<T, E, F, Fut>(ctx: &Context, label: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display + From<ContextError>,
{
    Executor::new(GENERAL).execute(ctx, label, op).await
}

/// Run `op` under an explicit policy. See [`Executor::execute`].
pub async fn execute_with<T, E, F, Fut>(
    ctx: &Context,
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display + From<ContextError>,
{
    Executor::new(*policy).execute(ctx, label, op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn throttled(retry_after: &str) -> anyhow::Error {
        ApiError::new(429, "Too Many Requests")
            .with_header("Retry-After", retry_after)
            .into()
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_success_never_waits() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let out: anyhow::Result<u32> = execute(&Context::new(), "get", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_use_server_hint() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let out: anyhow::Result<()> = execute(&Context::new(), "patch", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Err(throttled("3")),
                    _ => Ok(()),
                }
            }
        })
        .await;
        assert!(out.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn admission_permit_is_released_between_attempts() {
        let limiter = Arc::new(Semaphore::new(1));
        let executor = Executor::new(GENERAL).with_admission(Arc::clone(&limiter));
        let calls = AtomicU32::new(0);
        let out: anyhow::Result<()> = executor
            .execute(&Context::new(), "post", || {
                let held = limiter.available_permits() == 0;
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    assert!(held, "operation must run while holding the permit");
                    if n < 2 {
                        Err(throttled("1"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(out.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_context_stops_waiting_for_admission() {
        let limiter = Arc::new(Semaphore::new(0));
        let executor = Executor::default().with_admission(limiter);
        let ctx = Context::new();
        ctx.cancel();
        let calls = AtomicU32::new(0);
        let out: anyhow::Result<()> = executor
            .execute(&ctx, "get", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        let err = out.unwrap_err();
        assert_eq!(err.downcast_ref::<ContextError>(), Some(&ContextError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_limiter_fails_without_calling() {
        let limiter = Arc::new(Semaphore::new(1));
        limiter.close();
        let executor = Executor::default().with_admission(limiter);
        let calls = AtomicU32::new(0);
        let out: anyhow::Result<()> = executor
            .execute(&Context::new(), "delete", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        let err = out.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::LimiterClosed)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_hides_closures() {
        let executor = Executor::default().with_observer(|_| {});
        let s = format!("{executor:?}");
        assert!(s.contains("general"));
        assert!(s.contains("observer: true"));
    }
}
