//! Session tracker: one conversation's transcript, key and busy flag.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::gateway::types::{QUERY_FAILED, SUBMIT_FAILED};
use crate::gateway::{GatewayError, SummaryGateway};
use crate::session::exchange::{Exchange, ExchangeKind};
use crate::session::key::SessionKey;

/// Message recorded when the user submits blank text.
pub const EMPTY_INPUT_MESSAGE: &str = "text to summarize is required";

/// Why an operation was refused before reaching the backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
    /// Another operation is in flight.
    Busy,
    /// The submitted text was blank.
    EmptyInput,
    /// No session key exists yet.
    NoSession,
}

/// Outcome of a tracker operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dispatch {
    /// The backend call resolved and an entry of this kind was appended.
    Completed(ExchangeKind),
    /// The operation was refused.
    Rejected(Rejection),
    /// The session was reset while the call was in flight; the result was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct SessionState {
    key: Option<SessionKey>,
    exchanges: Vec<Exchange>,
    busy: bool,
    /// Bumped on every reset so late responses can be recognized.
    epoch: u64,
}

/// Tracks a single summarization session.
///
/// Operations take `&self`; a call made while another is in flight is
/// rejected rather than queued. State is never locked across an await.
pub struct SessionTracker {
    gateway: Arc<dyn SummaryGateway>,
    key_prefix: String,
    state: Mutex<SessionState>,
}

/// Clears the busy flag when an operation ends, including when its future
/// is dropped mid-flight. Does nothing if the session was reset meanwhile.
struct BusyGuard<'a> {
    state: &'a Mutex<SessionState>,
    epoch: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.epoch == self.epoch {
            state.busy = false;
        }
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionTracker {
    /// Create a tracker with no session yet.
    #[must_use]
    pub fn new(gateway: Arc<dyn SummaryGateway>, key_prefix: impl Into<String>) -> Self {
        Self {
            gateway,
            key_prefix: key_prefix.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Submit text for summarization.
    ///
    /// The user entry is appended before the backend is contacted. Every
    /// failure ends up as an error entry in the transcript.
    pub async fn submit(&self, text: &str, instruction: Option<&str>) -> Dispatch {
        let text = text.trim();
        let (key, guard) = {
            let mut state = lock(&self.state);
            if state.busy {
                debug!("Submit ignored: a request is already in flight");
                return Dispatch::Rejected(Rejection::Busy);
            }
            if text.is_empty() {
                state.exchanges.push(Exchange::error(EMPTY_INPUT_MESSAGE));
                return Dispatch::Rejected(Rejection::EmptyInput);
            }

            let key = if let Some(key) = state.key.clone() {
                key
            } else {
                let key = SessionKey::generate(&self.key_prefix);
                info!("Started session callkey={key}");
                state.key = Some(key.clone());
                key
            };
            state.exchanges.push(Exchange::user_input(text));
            state.busy = true;
            (key, self.guard(state.epoch))
        };

        let instruction = instruction.map(str::trim).filter(|s| !s.is_empty());
        let exchange = match self.gateway.submit(key.as_str(), text, instruction).await {
            Ok(response) if response.is_success() => Exchange::summary(response.answer),
            Ok(response) => {
                warn!(
                    "Summary refused for callkey={key}: result={} code={}",
                    response.result, response.code
                );
                Exchange::error(non_empty_or(&response.answer, SUBMIT_FAILED))
            }
            Err(err) => failure(&key, &err),
        };

        self.record(&guard, exchange)
    }

    /// Fetch the transcript and summary stored for the current session.
    pub async fn query(&self) -> Dispatch {
        let (key, guard) = {
            let mut state = lock(&self.state);
            let Some(key) = state.key.clone() else {
                debug!("Query ignored: no session yet");
                return Dispatch::Rejected(Rejection::NoSession);
            };
            if state.busy {
                debug!("Query ignored: a request is already in flight");
                return Dispatch::Rejected(Rejection::Busy);
            }
            state.busy = true;
            (key, self.guard(state.epoch))
        };

        let exchange = match self.gateway.fetch(key.as_str()).await {
            Ok(response) if response.is_success() => {
                Exchange::query_result(&response.original_text, &response.processed_text)
            }
            Ok(response) => {
                warn!(
                    "Lookup refused for callkey={key}: result={} code={}",
                    response.result, response.code
                );
                Exchange::error(non_empty_or(&response.original_text, QUERY_FAILED))
            }
            Err(err) => failure(&key, &err),
        };

        self.record(&guard, exchange)
    }

    /// Drop the transcript and session key, whatever is in flight.
    ///
    /// Responses to requests issued before the reset are discarded.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        if state.busy {
            info!("Session reset while a request is in flight; its result will be dropped");
        }
        if let Some(key) = state.key.take() {
            info!("Reset session callkey={key}");
        }
        state.exchanges.clear();
        state.busy = false;
        state.epoch = state.epoch.wrapping_add(1);
    }

    /// Start over on an existing key, e.g. to look up results from an earlier run.
    pub fn resume(&self, key: SessionKey) {
        self.reset();
        info!("Resumed session callkey={key}");
        lock(&self.state).key = Some(key);
    }

    /// Current session key, if any.
    #[must_use]
    pub fn session_key(&self) -> Option<SessionKey> {
        lock(&self.state).key.clone()
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        lock(&self.state).busy
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn exchanges(&self) -> Vec<Exchange> {
        lock(&self.state).exchanges.clone()
    }

    /// Entries appended after the first `seen` ones.
    #[must_use]
    pub fn exchanges_since(&self, seen: usize) -> Vec<Exchange> {
        lock(&self.state)
            .exchanges
            .get(seen..)
            .map(<[Exchange]>::to_vec)
            .unwrap_or_default()
    }

    /// Number of transcript entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).exchanges.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.state).exchanges.is_empty()
    }

    const fn guard(&self, epoch: u64) -> BusyGuard<'_> {
        BusyGuard {
            state: &self.state,
            epoch,
        }
    }

    /// Append the outcome unless the session was reset meanwhile.
    fn record(&self, guard: &BusyGuard<'_>, exchange: Exchange) -> Dispatch {
        let mut state = lock(&self.state);
        if state.epoch != guard.epoch {
            warn!("Dropping a {} response for a session that was reset", exchange.kind);
            return Dispatch::Discarded;
        }
        let kind = exchange.kind;
        state.exchanges.push(exchange);
        Dispatch::Completed(kind)
    }
}

fn failure(key: &SessionKey, err: &GatewayError) -> Exchange {
    warn!("Gateway call failed for callkey={key}: {err}");
    Exchange::error(err)
}

fn non_empty_or<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}
