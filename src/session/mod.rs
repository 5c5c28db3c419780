//! Conversation state for one summarization session.
//!
//! - `key`: session key generation
//! - `exchange`: transcript entries
//! - `tracker`: transcript, key and busy flag, mediating all gateway calls

pub mod exchange;
pub mod key;
pub mod tracker;

pub use exchange::{Exchange, ExchangeKind};
pub use key::SessionKey;
pub use tracker::{Dispatch, EMPTY_INPUT_MESSAGE, Rejection, SessionTracker};
