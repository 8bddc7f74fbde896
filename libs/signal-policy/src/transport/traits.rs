//! Transport boundary contract
//!
//! The dispatcher talks to the outside world only through [`Transport`]:
//! `receive` suspends until the next inbound signal, `send` emits one
//! outbound signal synchronously.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::value::Value;

/// Inbound token that ends the dispatch loop
pub const TERMINATE_TOKEN: &str = "quit";

/// Transport layer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Transport could not be created (unknown selector, missing source)
    #[error("Transport load failed: {0}")]
    LoadFailed(String),

    /// Send operation failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Receive operation failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// One outbound signal
///
/// The close handshake is the signal with an empty name and no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub value: Option<Value>,
}

impl Signal {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }

    /// Empty signal sent once when the loop terminates
    pub fn close() -> Self {
        Self {
            name: String::new(),
            value: None,
        }
    }

    pub fn is_close(&self) -> bool {
        self.name.is_empty() && self.value.is_none()
    }
}

/// Wire form: `name=literal`, bare `name` without a value, empty for close
impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value.to_literal()),
            None => write!(f, "{}", self.name),
        }
    }
}

/// What a transport delivers to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Signal update; `value` is raw text, `None` for a bare-token query
    Signal { name: String, value: Option<String> },
    /// `quit` or end of input
    Terminate,
}

impl Inbound {
    pub fn update(name: impl Into<String>, value: impl Into<String>) -> Self {
        Inbound::Signal {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn query(name: impl Into<String>) -> Self {
        Inbound::Signal {
            name: name.into(),
            value: None,
        }
    }
}

/// Pluggable signal source and sink
///
/// Implementations are shared between the dispatch task and delayed action
/// tasks, so `send` takes `&self` and must be internally synchronised.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Emit one outbound signal
    fn send(&self, signal: &Signal) -> Result<(), TransportError>;

    /// Wait for the next inbound signal
    ///
    /// Blank and malformed input is skipped internally; end of input is
    /// reported as [`Inbound::Terminate`].
    async fn receive(&self) -> Result<Inbound, TransportError>;
}
