use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid digest {value:?}: {reason}")]
    InvalidDigest { value: String, reason: String },

    #[error("unknown reference kind: {0:?}")]
    UnknownKind(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    pub fn reason(&self) -> Reason {
        match self {
            TypeError::InvalidDigest { .. } => Reason::BadRequest,
            TypeError::UnknownKind(_) => Reason::Invalid,
            TypeError::Serialization(_) => Reason::Internal,
        }
    }
}

/// Classification shared by every engine error.
///
/// Callers branch on the reason rather than on crate-specific variants:
/// `Conflict` and `ServerTimeout` mean "retry the whole call", everything
/// else is final for the given input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// Malformed reference or name.
    BadRequest,
    /// Stream, tag, or image absent.
    NotFound,
    /// Concurrent write to the same tag history, or a resourceVersion mismatch.
    Conflict,
    /// Duplicate tag create.
    AlreadyExists,
    /// Structurally invalid tag reference.
    Invalid,
    /// Retry budget exhausted or layer index not yet synced.
    ServerTimeout,
    /// Ambiguous digest prefix, or a collaborator failure.
    Internal,
    /// The caller cancelled the request.
    Cancelled,
}

impl Reason {
    /// Returns `true` if re-issuing the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Reason::Conflict | Reason::ServerTimeout)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::BadRequest => "BadRequest",
            Reason::NotFound => "NotFound",
            Reason::Conflict => "Conflict",
            Reason::AlreadyExists => "AlreadyExists",
            Reason::Invalid => "Invalid",
            Reason::ServerTimeout => "ServerTimeout",
            Reason::Internal => "Internal",
            Reason::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}
