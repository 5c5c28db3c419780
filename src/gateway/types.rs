//! Wire types exchanged with the summarization backend.

use serde::{Deserialize, Deserializer, Serialize};

/// `result` value the backend uses for success.
pub const RESULT_OK: &str = "1";
/// `code` value the backend uses for success.
pub const CODE_OK: &str = "OK";

/// Fallback message when a summarization request fails without a reason.
pub const SUBMIT_FAILED: &str = "summary request failed";
/// Fallback message when a lookup fails without a reason.
pub const QUERY_FAILED: &str = "summary lookup failed";

/// Body of a summarization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitRequest<'a> {
    /// Session key.
    pub callkey: &'a str,
    /// Transcript to summarize.
    pub text: &'a str,
    /// Optional instruction. Omitted entirely when absent so the backend
    /// falls back to its default prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<&'a str>,
}

impl<'a> SubmitRequest<'a> {
    /// Build a request, dropping a blank instruction.
    #[must_use]
    pub fn new(callkey: &'a str, text: &'a str, instruction: Option<&'a str>) -> Self {
        Self {
            callkey,
            text,
            system_prompt: instruction.map(str::trim).filter(|s| !s.is_empty()),
        }
    }
}

/// Response to a summarization request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitResponse {
    /// `"1"` on success.
    #[serde(deserialize_with = "nullable")]
    pub result: String,
    /// `"OK"` on success, an error code otherwise.
    #[serde(deserialize_with = "nullable")]
    pub code: String,
    /// The summary, or an error message on failure.
    #[serde(deserialize_with = "nullable")]
    pub answer: String,
}

impl SubmitResponse {
    /// Whether the backend accepted the request.
    #[must_use]
    pub fn is_success(&self) -> bool {
        is_success(&self.result, &self.code)
    }
}

/// Response to a stored-summary lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    /// `"1"` on success.
    #[serde(deserialize_with = "nullable")]
    pub result: String,
    /// `"OK"` on success, an error code otherwise.
    #[serde(deserialize_with = "nullable")]
    pub code: String,
    /// Key the record was stored under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callkey: Option<String>,
    /// Stored transcript, or an error message on failure.
    #[serde(deserialize_with = "nullable")]
    pub original_text: String,
    /// Stored summary.
    #[serde(deserialize_with = "nullable")]
    pub processed_text: String,
    /// When the record was first stored. Kept opaque: the backend may send
    /// either an ISO string or a date array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<serde_json::Value>,
    /// When the record was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<serde_json::Value>,
}

impl QueryResponse {
    /// Whether the lookup found a stored record.
    #[must_use]
    pub fn is_success(&self) -> bool {
        is_success(&self.result, &self.code)
    }
}

fn is_success(result: &str, code: &str) -> bool {
    result == RESULT_OK && code == CODE_OK
}

/// The backend serializes absent fields as `null`.
fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
