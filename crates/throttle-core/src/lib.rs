//! Reactive throttling resilience for rate-limited HTTP APIs.
//!
//! The core entry point is [`retry::execute`] (or an [`retry::Executor`] built
//! from a named [`retry::RetryPolicy`]), which absorbs HTTP 429 responses by
//! waiting and retrying and hands every other outcome straight back.

pub mod client_lock;
pub mod config;
pub mod logging;
pub mod retry;

pub use client_lock::ClientLock;
pub use retry::{execute, execute_with, ApiError, Context, ContextError, Executor, RetryPolicy};
