//! Opaque user identifier.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Key selecting one user's accumulated text.
///
/// No validation beyond non-empty: an absent or empty identifier resolves to
/// [`UserId::DEFAULT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Sentinel used when the caller supplies no identifier.
    pub const DEFAULT: &'static str = "default";

    /// Resolve an optional caller-supplied identifier.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::default(),
        }
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the sentinel identifier.
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::resolve(Some(id))
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        if id.is_empty() { Self::default() } else { Self(id) }
    }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
