//! Parse the vendor throttle-scope header (`scope/limit/applicationId/resourceId`).
//!
//! The result is only used to enrich diagnostics; it never drives a retry
//! decision.

use std::fmt;

/// Which quota the server says was exceeded.
///
/// Either every field is populated or every field is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleScope {
    pub scope: String,
    pub limit: String,
    pub application_id: String,
    pub resource_id: String,
}

impl ThrottleScope {
    /// Parse a raw header value. Anything other than exactly four non-empty
    /// `/`-separated segments yields the empty value.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.trim().split('/').collect();
        let [scope, limit, application_id, resource_id] = parts.as_slice() else {
            return Self::default();
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Self::default();
        }
        Self {
            scope: scope.to_string(),
            limit: limit.to_string(),
            application_id: application_id.to_string(),
            resource_id: resource_id.to_string(),
        }
    }

    /// True for the zero value produced by a failed parse.
    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }
}

impl fmt::Display for ThrottleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.scope, self.limit, self.application_id, self.resource_id
        )
    }
}
