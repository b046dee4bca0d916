//! Exponential backoff with equal jitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::policy::RetryPolicy;

/// Un-jittered delay for a 0-based attempt: `min(base * 2^attempt, max_backoff)`.
///
/// Saturates to `max_backoff` for attempt counts whose multiplier would overflow.
pub fn backoff_ceiling(attempt: u32, policy: &RetryPolicy) -> Duration {
    1u32.checked_shl(attempt)
        .and_then(|factor| policy.base_delay.checked_mul(factor))
        .map_or(policy.max_backoff, |raw| raw.min(policy.max_backoff))
}

/// Per-invocation delay calculator. Owns its own random source so
/// concurrent retry loops never share state.
#[derive(Debug, Clone)]
pub struct Backoff {
    rng: SmallRng,
}

impl Backoff {
    /// Seed from the system clock's nanosecond reading, mixed with a
    /// process-wide sequence number so loops started in the same clock tick
    /// still draw different jitter.
    pub fn from_clock() -> Self {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self::with_seed(nanos ^ seq.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Wait before the next attempt.
    ///
    /// A server hint is returned unchanged. Otherwise the result is drawn
    /// uniformly from `[raw/2, raw]` (both ends inclusive) where `raw` is
    /// [`backoff_ceiling`].
    pub fn compute_delay(
        &mut self,
        attempt: u32,
        policy: &RetryPolicy,
        server_hint: Option<Duration>,
    ) -> Duration {
        if let Some(hint) = server_hint {
            return hint;
        }
        self.jitter(backoff_ceiling(attempt, policy))
    }

    /// `raw/2 + U[0, raw/2]`, at nanosecond resolution.
    pub fn jitter(&mut self, raw: Duration) -> Duration {
        let half = raw / 2;
        let half_nanos = u64::try_from(half.as_nanos()).unwrap_or(u64::MAX);
        half + Duration::from_nanos(self.rng.gen_range(0..=half_nanos))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_clock()
    }
}
