//! Session key generation.

use core::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one summarization conversation (`callkey` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generate a fresh key as `<prefix>-<unix millis>-<random suffix>`.
    ///
    /// The random suffix keeps keys distinct when several sessions are
    /// created within the same millisecond.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        let suffix = suffix.get(..8).unwrap_or(&suffix);
        Self(format!("{prefix}-{millis}-{suffix}"))
    }

    /// Adopt an existing key, e.g. one produced by an earlier run.
    ///
    /// Returns `None` when the key is blank.
    #[must_use]
    pub fn from_string(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
