//! Policy engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for rule loading and compilation
pub type Result<T> = std::result::Result<T, RuleError>;

/// Startup-time errors: rule compilation and document loading.
///
/// Every variant is fatal. No partial rule set is ever activated.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Malformed condition or missing required `emit` fields
    #[error("Rule #{index} syntax error: {message}")]
    Syntax { index: usize, message: String },

    /// Document is not a sequence of rule blocks
    #[error("Invalid rule document: {0}")]
    InvalidDocument(String),

    /// Malformed `name = value` entry in the initial-state document
    #[error("Invalid initial state entry '{entry}': {reason}")]
    InvalidState { entry: String, reason: String },

    /// Document could not be read
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuleError {
    pub fn syntax(index: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            index,
            message: message.into(),
        }
    }

    pub fn invalid_state(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_yaml::Error> for RuleError {
    fn from(err: serde_yaml::Error) -> Self {
        RuleError::InvalidDocument(err.to_string())
    }
}

/// Condition parse failure, reported with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Reasons a condition could not be decided.
///
/// Never fatal: the rule simply does not fire for this update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Referenced signal has not been received yet
    #[error("signal '{0}' has no value yet")]
    MissingSignal(String),

    /// Comparison between incompatible operand types
    #[error("type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Non-boolean value where a truth value is required
    #[error("type mismatch: '{op}' expects a boolean, got {found}")]
    NotBoolean {
        op: &'static str,
        found: &'static str,
    },
}

impl EvalError {
    /// Whether this is a type error rather than missing state
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. } | Self::NotBoolean { .. })
    }
}
