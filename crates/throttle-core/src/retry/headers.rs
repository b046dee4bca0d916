//! Case-insensitive, multi-valued response header map.

use std::collections::BTreeMap;

/// Standard `Retry-After` header (integer seconds).
pub const RETRY_AFTER: &str = "retry-after";
/// Vendor header describing which quota was exceeded: `scope/limit/appId/resourceId`.
pub const THROTTLE_SCOPE: &str = "x-ms-throttle-scope";
/// Vendor free-text header with additional throttling detail.
pub const THROTTLE_INFORMATION: &str = "x-ms-throttle-information";

/// Response headers keyed by lower-cased name.
///
/// A name may carry several values; they are kept in the order they were
/// received. Singular lookups (`get`) use the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`, keeping any existing values.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values for `name` in arrival order (empty when absent).
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, values)` pairs; names are lower-cased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Parse raw `Name: value` header lines as delivered by a transport's
    /// header callback. Status lines and blank lines are skipped.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut headers = Self::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with("HTTP/") {
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                headers.append(name, value.trim());
            }
        }
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}
