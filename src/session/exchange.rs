//! Transcript entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a transcript entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    /// Text the user submitted.
    UserInput,
    /// Summary returned by the backend.
    Summary,
    /// Stored transcript and summary retrieved by key.
    QueryResult,
    /// Any failure surfaced to the user.
    Error,
}

impl ExchangeKind {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserInput => "user_input",
            Self::Summary => "summary",
            Self::QueryResult => "query_result",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single transcript entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Kind of the entry.
    pub kind: ExchangeKind,
    /// Text content.
    pub body: String,
    /// Creation time.
    pub occurred_at: DateTime<Utc>,
}

impl Exchange {
    fn now(kind: ExchangeKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Build a user input entry.
    #[must_use]
    pub fn user_input(text: impl Into<String>) -> Self {
        Self::now(ExchangeKind::UserInput, text)
    }

    /// Build a summary entry.
    #[must_use]
    pub fn summary(answer: impl Into<String>) -> Self {
        Self::now(ExchangeKind::Summary, answer)
    }

    /// Build a query result entry holding both stored texts.
    #[must_use]
    pub fn query_result(original: &str, processed: &str) -> Self {
        Self::now(
            ExchangeKind::QueryResult,
            format!("Stored original: {original}\n\nStored summary: {processed}"),
        )
    }

    /// Build an error entry.
    #[must_use]
    pub fn error(message: impl fmt::Display) -> Self {
        Self::now(ExchangeKind::Error, format!("Error: {message}"))
    }
}
