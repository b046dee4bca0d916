//! Cancellation and deadline carrier passed into the retry loop.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::ContextError;

/// Bounds the total wall-clock time of a retry loop.
///
/// The loop has no attempt cap, so a deadline or explicit cancellation is the
/// only way to stop it while the server keeps answering 429.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now. A timeout too large to
    /// represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context cancelled with this one, optionally with a tighter deadline.
    /// The earlier of the two deadlines applies.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.and_then(|t| Instant::now().checked_add(t));
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check; `Some` once the context is done.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => ContextError::Canceled,
                () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_context_is_not_done() {
        let ctx = Context::new();
        assert_eq!(ctx.err(), None);
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn cancel_is_observed() {
        let ctx = Context::new();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
        assert_eq!(ctx.done().await, ContextError::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_at_timeout() {
        let start = Instant::now();
        let ctx = Context::with_timeout(Duration::from_secs(3));
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn child_inherits_cancellation_and_earlier_deadline() {
        let parent = Context::with_timeout(Duration::from_secs(10));
        let tight = parent.child(Some(Duration::from_secs(2)));
        let loose = parent.child(Some(Duration::from_secs(60)));
        assert!(tight.deadline() < parent.deadline());
        assert_eq!(loose.deadline(), parent.deadline());

        parent.cancel();
        assert_eq!(tight.err(), Some(ContextError::Canceled));
        assert_eq!(loose.done().await, ContextError::Canceled);
    }

    #[tokio::test]
    async fn unrepresentable_timeout_means_no_deadline() {
        let ctx = Context::with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert_eq!(ctx.err(), None);

        let child = Context::new().child(Some(Duration::MAX));
        assert!(child.deadline().is_none());

        let bounded = Context::with_timeout(Duration::from_secs(5));
        assert_eq!(bounded.child(Some(Duration::MAX)).deadline(), bounded.deadline());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_alone() {
        let parent = Context::new();
        let child = parent.child(None);
        child.cancel();
        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert_eq!(parent.err(), None);
    }
}
