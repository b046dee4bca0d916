//! Process-wide exclusive access to an SDK client that is not safe to use
//! concurrently.
//!
//! Operation closures acquire the lock around the transport call only. The
//! retry loop never holds it, so a task waiting out a 429 does not block
//! other callers.

use tokio::sync::{Mutex, MutexGuard};

/// Serializes every call made through the wrapped client.
#[derive(Debug, Default)]
pub struct ClientLock<C> {
    client: Mutex<C>,
}

impl<C> ClientLock<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Run `f` with exclusive access; the lock is released when `f` returns.
    pub async fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut guard = self.client.lock().await;
        f(&mut guard)
    }

    /// Exclusive access for callers that need to `.await` while holding the
    /// client. Released when the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, C> {
        self.client.lock().await
    }

    pub fn into_inner(self) -> C {
        self.client.into_inner()
    }
}
