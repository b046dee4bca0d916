//! Named retry policies.
//!
//! Policies differ only in their backoff constants and in the quota notes
//! attached to diagnostics. The notes describe known external budgets so an
//! operator can match an observed wait to a quota; nothing here enforces them.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which named policy a call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyName {
    /// Default for most calls.
    General,
    /// Bulk license/group assignment endpoints.
    BulkAssignment,
    /// Tenant-scoped writes.
    TenantWrite,
    /// Tenant-scoped reads.
    TenantRead,
}

impl PolicyName {
    pub const ALL: [PolicyName; 4] = [
        PolicyName::General,
        PolicyName::BulkAssignment,
        PolicyName::TenantWrite,
        PolicyName::TenantRead,
    ];

    /// Label used in logs and config files.
    pub fn label(self) -> &'static str {
        match self {
            PolicyName::General => "general",
            PolicyName::BulkAssignment => "bulk-assignment",
            PolicyName::TenantWrite => "tenant-write",
            PolicyName::TenantRead => "tenant-read",
        }
    }

    /// The built-in policy for this name.
    pub fn builtin(self) -> &'static RetryPolicy {
        match self {
            PolicyName::General => &GENERAL,
            PolicyName::BulkAssignment => &BULK_ASSIGNMENT,
            PolicyName::TenantWrite => &TENANT_WRITE,
            PolicyName::TenantRead => &TENANT_READ,
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a policy label is not one of the built-in names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown retry policy `{0}`")]
pub struct UnknownPolicy(pub String);

impl FromStr for PolicyName {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyName::ALL
            .into_iter()
            .find(|name| name.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPolicy(s.to_string()))
    }
}

/// A known external request budget, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaWindow {
    /// Who the budget applies to, e.g. "per-app write".
    pub scope: &'static str,
    pub requests: u32,
    pub window: Duration,
}

impl fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.window.as_secs();
        if secs >= 3600 && secs % 3600 == 0 {
            write!(f, "{}: {}/{}h", self.scope, self.requests, secs / 3600)
        } else {
            write!(f, "{}: {}/{}s", self.scope, self.requests, secs)
        }
    }
}

/// Exponential backoff parameters for 429 handling.
///
/// There is deliberately no attempt cap: the loop retries until success, a
/// non-429 failure, or the caller's context ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub name: PolicyName,
    /// Delay before the first retry (attempt 0), before jitter.
    pub base_delay: Duration,
    /// Ceiling applied before jitter.
    pub max_backoff: Duration,
    pub quotas: &'static [QuotaWindow],
}

pub const GENERAL: RetryPolicy = RetryPolicy {
    name: PolicyName::General,
    base_delay: Duration::from_secs(2),
    max_backoff: Duration::from_secs(10),
    quotas: &[],
};

pub const BULK_ASSIGNMENT: RetryPolicy = RetryPolicy {
    name: PolicyName::BulkAssignment,
    base_delay: Duration::from_secs(3),
    max_backoff: Duration::from_secs(10),
    quotas: &[
        QuotaWindow {
            scope: "per-app",
            requests: 500,
            window: Duration::from_secs(10),
        },
        QuotaWindow {
            scope: "per-app",
            requests: 15_000,
            window: Duration::from_secs(3600),
        },
    ],
};

pub const TENANT_WRITE: RetryPolicy = RetryPolicy {
    name: PolicyName::TenantWrite,
    base_delay: Duration::from_secs(2),
    max_backoff: Duration::from_secs(10),
    quotas: &[
        QuotaWindow {
            scope: "per-app write",
            requests: 3_000,
            window: Duration::from_secs(150),
        },
        QuotaWindow {
            scope: "per-tenant write",
            requests: 18_000,
            window: Duration::from_secs(150),
        },
    ],
};

pub const TENANT_READ: RetryPolicy = RetryPolicy {
    name: PolicyName::TenantRead,
    base_delay: Duration::from_secs(2),
    max_backoff: Duration::from_secs(10),
    quotas: &[
        QuotaWindow {
            scope: "per-app read",
            requests: 8_000,
            window: Duration::from_secs(150),
        },
        QuotaWindow {
            scope: "per-tenant read",
            requests: 24_000,
            window: Duration::from_secs(150),
        },
    ],
};

impl Default for RetryPolicy {
    fn default() -> Self {
        GENERAL
    }
}

impl RetryPolicy {
    pub fn label(&self) -> &'static str {
        self.name.label()
    }

    /// Same policy with different backoff constants.
    pub fn with_delays(self, base_delay: Duration, max_backoff: Duration) -> Self {
        Self {
            base_delay,
            max_backoff,
            ..self
        }
    }

    /// Quota notes joined for a single log field; empty when none are known.
    pub fn quota_summary(&self) -> String {
        self.quotas
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The full set of named policies, possibly with configured overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: [RetryPolicy; 4],
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            policies: PolicyName::ALL.map(|name| *name.builtin()),
        }
    }
}

impl PolicyTable {
    pub fn get(&self, name: PolicyName) -> &RetryPolicy {
        &self.policies[Self::index(name)]
    }

    /// Replace the backoff constants for one policy.
    pub fn set_delays(&mut self, name: PolicyName, base_delay: Duration, max_backoff: Duration) {
        let slot = &mut self.policies[Self::index(name)];
        *slot = slot.with_delays(base_delay, max_backoff);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetryPolicy> {
        self.policies.iter()
    }

    fn index(name: PolicyName) -> usize {
        match name {
            PolicyName::General => 0,
            PolicyName::BulkAssignment => 1,
            PolicyName::TenantWrite => 2,
            PolicyName::TenantRead => 3,
        }
    }
}
