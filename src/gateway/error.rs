//! Error types for the backend gateway.

use thiserror::Error;

/// Generic message used when the backend never answered.
/// Must match the `Connectivity` display text.
pub const CONNECTIVITY_MESSAGE: &str = "unable to reach the summarization server";

/// Errors that can occur while talking to the summarization backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend answered with a structured failure.
    #[error("{message}")]
    Application {
        /// Backend error code (`E400`, `E404`, `E500`...), when provided.
        code: Option<String>,
        /// Failure message extracted from the response body.
        message: String,
    },

    /// No response was received (connect failure or timeout).
    #[error("unable to reach the summarization server")]
    Connectivity,

    /// Anything else that went wrong locally.
    #[error("{0}")]
    Local(String),

    /// The configured base URL could not be parsed.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl GatewayError {
    /// Build an application error from a backend code and message.
    #[must_use]
    pub fn application(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Application {
            code: code.filter(|c| !c.is_empty()),
            message: message.into(),
        }
    }

    /// Classify a transport error from `reqwest`.
    ///
    /// Timeouts and failures to connect or dispatch mean the request never
    /// got an answer; everything else is treated as a local failure.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Connectivity
        } else {
            Self::Local(err.to_string())
        }
    }

    /// Whether the backend itself reported the failure.
    #[must_use]
    pub const fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_message_is_generic() {
        assert_eq!(GatewayError::Connectivity.to_string(), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_application_displays_message_only() {
        let err = GatewayError::application(Some("E401".to_string()), "text: required");
        assert_eq!(err.to_string(), "text: required");
        assert!(err.is_application());
    }

    #[test]
    fn test_application_drops_empty_code() {
        let err = GatewayError::application(Some(String::new()), "boom");
        match err {
            GatewayError::Application { code, .. } => assert!(code.is_none()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GatewayError::from(url::Url::parse("not a url").unwrap_err());
        assert!(err.to_string().starts_with("invalid base url"));
        assert!(!err.is_application());
    }
}
