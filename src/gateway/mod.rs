//! Backend gateway for the summarization service.
//!
//! The gateway is stateless: it turns the two logical operations
//! (submit a transcript, fetch a stored summary) into HTTP calls and
//! classifies every failure as an application error, a connectivity
//! failure or a local failure.

pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use config::GatewayConfig;
pub use error::{CONNECTIVITY_MESSAGE, GatewayError, GatewayResult};
pub use http::HttpSummaryGateway;
pub use types::{QueryResponse, SubmitRequest, SubmitResponse};

use std::future::Future;
use std::pin::Pin;

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over the summarization backend.
pub trait SummaryGateway: Send + Sync {
    /// Submit a transcript for summarization under `session_key`.
    ///
    /// `instruction` replaces the backend's default prompt when present.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the request or cannot be reached.
    fn submit<'a>(
        &'a self,
        session_key: &'a str,
        text: &'a str,
        instruction: Option<&'a str>,
    ) -> GatewayFuture<'a, GatewayResult<SubmitResponse>>;

    /// Fetch the transcript and summary stored under `session_key`.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the lookup or cannot be reached.
    fn fetch<'a>(&'a self, session_key: &'a str) -> GatewayFuture<'a, GatewayResult<QueryResponse>>;
}
