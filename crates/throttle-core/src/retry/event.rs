//! Diagnostic record emitted for every retry decision.

use std::time::Duration;

use super::classify::ErrorSignal;
use super::policy::RetryPolicy;
use super::scope::ThrottleScope;

/// One 429 that the loop decided to wait out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// Caller-supplied operation label.
    pub operation: String,
    pub policy: &'static str,
    /// 1-based retry number.
    pub attempt: u32,
    pub delay: Duration,
    /// True when `delay` came from the server's `Retry-After`.
    pub server_hint: bool,
    pub status_code: u16,
    pub scope: Option<ThrottleScope>,
    pub throttle_information: Option<String>,
    pub quota: String,
}

impl RetryEvent {
    pub(crate) fn new(
        operation: &str,
        policy: &RetryPolicy,
        attempt: u32,
        delay: Duration,
        signal: &ErrorSignal,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            policy: policy.label(),
            attempt,
            delay,
            server_hint: signal.retry_after.is_some(),
            status_code: signal.status_code,
            scope: signal.throttle_scope(),
            throttle_information: signal.throttle_information().map(str::to_string),
            quota: policy.quota_summary(),
        }
    }

    /// Write the record as a structured `warn` event.
    pub fn emit(&self) {
        let scope = self.scope.as_ref();
        tracing::warn!(
            target: "throttle_core::retry",
            operation = %self.operation,
            policy = self.policy,
            attempt = self.attempt,
            wait_secs = self.delay.as_secs_f64(),
            server_hint = self.server_hint,
            status = self.status_code,
            throttle_scope = scope.map(|s| s.scope.as_str()),
            throttle_limit = scope.map(|s| s.limit.as_str()),
            throttle_app = scope.map(|s| s.application_id.as_str()),
            throttle_resource = scope.map(|s| s.resource_id.as_str()),
            throttle_info = self.throttle_information.as_deref(),
            quota = (!self.quota.is_empty()).then_some(self.quota.as_str()),
            "throttled, retrying after backoff"
        );
    }
}
