//! Error types for reference parsing and validation.

use ist_types::Reason;
use thiserror::Error;

/// Errors that can occur while parsing or validating references.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    /// The input string is not a well-formed reference.
    #[error("malformed reference {input:?}: {reason}")]
    Malformed { input: String, reason: String },

    /// A tag or stream name breaks the naming rules.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A tag reference is structurally invalid.
    #[error("invalid tag reference {tag:?}: {reason}")]
    InvalidTagReference { tag: String, reason: String },
}

impl RefError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        RefError::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            RefError::Malformed { .. } => Reason::BadRequest,
            RefError::InvalidName { .. } | RefError::InvalidTagReference { .. } => Reason::Invalid,
        }
    }
}

/// Convenience type alias for reference operations.
pub type Result<T> = std::result::Result<T, RefError>;
