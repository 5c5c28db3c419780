//! HTTP implementation of the summarization gateway.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::gateway::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{
    QUERY_FAILED, QueryResponse, SUBMIT_FAILED, SubmitRequest, SubmitResponse,
};
use crate::gateway::{GatewayFuture, SummaryGateway};

/// Content type sent with every request.
const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Path of the submission endpoint.
const PROCESS_PATH: [&str; 3] = ["summary", "stt", "process"];
/// Path prefix of the lookup endpoint; the key is appended as a segment.
const QUERY_PATH: [&str; 3] = ["summary", "stt", "query"];

/// Reply body shape shared by both endpoints.
trait BackendReply: DeserializeOwned {
    /// Fallback when a failure carries no message.
    const DEFAULT_FAILURE: &'static str;

    fn code(&self) -> &str;

    /// Field that carries the message when the backend reports failure.
    fn failure_message(&self) -> &str;
}

impl BackendReply for SubmitResponse {
    const DEFAULT_FAILURE: &'static str = SUBMIT_FAILED;

    fn code(&self) -> &str {
        &self.code
    }

    fn failure_message(&self) -> &str {
        &self.answer
    }
}

impl BackendReply for QueryResponse {
    const DEFAULT_FAILURE: &'static str = QUERY_FAILED;

    fn code(&self) -> &str {
        &self.code
    }

    fn failure_message(&self) -> &str {
        &self.original_text
    }
}

/// Gateway that talks to the summarization backend over HTTP.
#[derive(Clone, Debug)]
pub struct HttpSummaryGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSummaryGateway {
    /// Create a gateway from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Base address requests are sent to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Local(format!("cannot build a path on {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_submit(
        &self,
        session_key: &str,
        text: &str,
        instruction: Option<&str>,
    ) -> GatewayResult<SubmitResponse> {
        let url = self.endpoint(PROCESS_PATH)?;
        let request = SubmitRequest::new(session_key, text, instruction);
        let body = serde_json::to_vec(&request)
            .map_err(|e| GatewayError::Local(format!("failed to encode request: {e}")))?;

        debug!(
            "Submitting {} chars for callkey={session_key} (custom prompt: {})",
            text.chars().count(),
            request.system_prompt.is_some()
        );

        let sent = self.client.post(url).body(body).send().await;
        finish(sent).await
    }

    async fn get_query(&self, session_key: &str) -> GatewayResult<QueryResponse> {
        let url = self.endpoint(QUERY_PATH.into_iter().chain([session_key]))?;
        debug!("Querying stored summary for callkey={session_key}");

        let sent = self.client.get(url).send().await;
        finish(sent).await
    }
}

impl SummaryGateway for HttpSummaryGateway {
    fn submit<'a>(
        &'a self,
        session_key: &'a str,
        text: &'a str,
        instruction: Option<&'a str>,
    ) -> GatewayFuture<'a, GatewayResult<SubmitResponse>> {
        Box::pin(self.post_submit(session_key, text, instruction))
    }

    fn fetch<'a>(&'a self, session_key: &'a str) -> GatewayFuture<'a, GatewayResult<QueryResponse>> {
        Box::pin(self.get_query(session_key))
    }
}

/// Parse and validate the backend base URL.
fn parse_base_url(raw: &str) -> GatewayResult<Url> {
    let url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::Local(format!(
            "unsupported backend address: {raw}"
        )));
    }
    Ok(url)
}

/// Classify the outcome of a request into a parsed reply or a gateway error.
async fn finish<T: BackendReply>(
    sent: Result<reqwest::Response, reqwest::Error>,
) -> GatewayResult<T> {
    let response = sent.map_err(|e| {
        warn!("Summarization backend request failed: {e}");
        GatewayError::from_transport(&e)
    })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
        warn!("Failed to read backend response body: {e}");
        GatewayError::from_transport(&e)
    })?;

    if !status.is_success() {
        let reply = serde_json::from_slice::<T>(&bytes).ok();
        let message = reply
            .as_ref()
            .map(T::failure_message)
            .filter(|m| !m.is_empty())
            .unwrap_or(T::DEFAULT_FAILURE)
            .to_string();
        let code = reply.map(|r| r.code().to_string());
        warn!("Backend rejected request with status {status}: {message}");
        return Err(GatewayError::application(code, message));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::Local(format!("malformed backend response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use crate::session::{Dispatch, ExchangeKind, SessionTracker};

    /// Stub of the summarization backend.
    fn backend() -> Router {
        Router::new()
            .route("/summary/stt/process", post(process))
            .route("/summary/stt/query/{callkey}", get(query))
            .route(
                "/broken/summary/stt/process",
                post(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream down</html>") }),
            )
            .route(
                "/garbled/summary/stt/process",
                post(|| async { (StatusCode::OK, "not json") }),
            )
            .route(
                "/slow/summary/stt/process",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!({ "result": "1", "code": "OK", "answer": "late" }))
                }),
            )
    }

    async fn process(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type != JSON_UTF8 {
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(json!({ "result": "0", "code": "E415", "answer": content_type })),
            );
        }
        let text = body["text"].as_str().unwrap_or_default();
        if text == "fail" {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "result": "0", "code": "E401", "answer": "text is required" })),
            );
        }
        let prompt = body.get("system_prompt").map_or("default", |p| {
            p.as_str().unwrap_or("null")
        });
        let answer = format!("{}|{text}|{prompt}", body["callkey"].as_str().unwrap_or_default());
        (StatusCode::OK, Json(json!({ "result": "1", "code": "OK", "answer": answer })))
    }

    async fn query(Path(callkey): Path<String>) -> (StatusCode, Json<Value>) {
        if callkey == "missing" {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "result": "0", "code": "E404", "callkey": null,
                    "original_text": "no stored result for missing", "processed_text": null
                })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "result": "1", "code": "OK", "callkey": callkey,
                "original_text": format!("stored for {callkey}"),
                "processed_text": "stored summary",
                "created_at": [2025, 1, 2, 10, 0], "updated_at": null
            })),
        )
    }

    async fn spawn_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend()).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn gateway(base: &str) -> HttpSummaryGateway {
        HttpSummaryGateway::new(&GatewayConfig::new().with_base_url(base)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = HttpSummaryGateway::new(&GatewayConfig::new().with_base_url("nope")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err =
            HttpSummaryGateway::new(&GatewayConfig::new().with_base_url("mailto:a@b.c")).unwrap_err();
        assert!(matches!(err, GatewayError::Local(_)));
    }

    #[test]
    fn test_process_endpoint() {
        let url = gateway("http://localhost:29080").endpoint(PROCESS_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:29080/summary/stt/process");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = gateway("http://localhost:29080/api/").endpoint(PROCESS_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:29080/api/summary/stt/process");
    }

    #[test]
    fn test_query_endpoint_encodes_key() {
        let url = gateway("http://localhost:29080")
            .endpoint(QUERY_PATH.into_iter().chain(["a b/c"]))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:29080/summary/stt/query/a%20b%2Fc");
    }

    #[tokio::test]
    async fn test_submit_success() {
        let base = spawn_backend().await;
        let reply = gateway(&base).submit("call-1", "hello", None).await.unwrap();

        assert!(reply.is_success());
        assert_eq!(reply.answer, "call-1|hello|default");
    }

    #[tokio::test]
    async fn test_submit_sends_instruction() {
        let base = spawn_backend().await;
        let reply = gateway(&base)
            .submit("call-1", "hello", Some("bullets"))
            .await
            .unwrap();

        assert_eq!(reply.answer, "call-1|hello|bullets");
    }

    #[tokio::test]
    async fn test_submit_application_error_uses_answer() {
        let base = spawn_backend().await;
        let err = gateway(&base).submit("call-1", "fail", None).await.unwrap_err();

        match err {
            GatewayError::Application { code, message } => {
                assert_eq!(code.as_deref(), Some("E401"));
                assert_eq!(message, "text is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unstructured_failure_uses_default_message() {
        let base = spawn_backend().await;
        let err = gateway(&format!("{base}/broken"))
            .submit("call-1", "hello", None)
            .await
            .unwrap_err();

        match err {
            GatewayError::Application { code, message } => {
                assert!(code.is_none());
                assert_eq!(message, SUBMIT_FAILED);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_local_failure() {
        let base = spawn_backend().await;
        let err = gateway(&format!("{base}/garbled"))
            .submit("call-1", "hello", None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Local(_)));
    }

    #[tokio::test]
    async fn test_closed_port_is_connectivity_failure() {
        let base = closed_port().await;
        let err = gateway(&base).submit("call-1", "hello", None).await.unwrap_err();

        assert!(matches!(err, GatewayError::Connectivity));
    }

    #[tokio::test]
    async fn test_timeout_is_connectivity_failure() {
        let base = spawn_backend().await;
        let config = GatewayConfig::new()
            .with_base_url(format!("{base}/slow"))
            .with_timeout(Duration::from_millis(200));
        let err = HttpSummaryGateway::new(&config)
            .unwrap()
            .submit("call-1", "hello", None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Connectivity));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = spawn_backend().await;
        let reply = gateway(&base).fetch("call-7").await.unwrap();

        assert!(reply.is_success());
        assert_eq!(reply.callkey.as_deref(), Some("call-7"));
        assert_eq!(reply.original_text, "stored for call-7");
        assert_eq!(reply.processed_text, "stored summary");
        assert!(reply.created_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_decodes_key_in_path() {
        let base = spawn_backend().await;
        let reply = gateway(&base).fetch("odd key").await.unwrap();

        assert_eq!(reply.original_text, "stored for odd key");
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_original_text() {
        let base = spawn_backend().await;
        let err = gateway(&base).fetch("missing").await.unwrap_err();

        match err {
            GatewayError::Application { code, message } => {
                assert_eq!(code.as_deref(), Some("E404"));
                assert_eq!(message, "no stored result for missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tracker_round_trip_over_http() {
        let base = spawn_backend().await;
        let tracker = SessionTracker::new(Arc::new(gateway(&base)), "e2e");

        let submitted = tracker.submit("hello", Some("short")).await;
        let queried = tracker.query().await;

        assert_eq!(submitted, Dispatch::Completed(ExchangeKind::Summary));
        assert_eq!(queried, Dispatch::Completed(ExchangeKind::QueryResult));
        let key = tracker.session_key().unwrap();
        let exchanges = tracker.exchanges();
        assert_eq!(exchanges[1].body, format!("{key}|hello|short"));
        assert!(exchanges[2].body.contains(&format!("stored for {key}")));
        assert!(exchanges[2].body.contains("stored summary"));
    }

    #[tokio::test]
    async fn test_tracker_reports_unreachable_backend() {
        let base = closed_port().await;
        let tracker = SessionTracker::new(Arc::new(gateway(&base)), "e2e");

        tracker.submit("hello", None).await;

        let exchanges = tracker.exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[1].kind, ExchangeKind::Error);
        assert!(exchanges[1].body.contains(crate::gateway::CONNECTIVITY_MESSAGE));
    }
}
