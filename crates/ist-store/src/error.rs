use ist_types::Reason;

/// Errors from stream and image store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// An object with this key already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// The caller's resourceVersion is stale.
    #[error("conflict on {key}: resourceVersion {expected:?} does not match stored {actual:?}")]
    Conflict {
        key: String,
        expected: String,
        actual: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn reason(&self) -> Reason {
        match self {
            StoreError::NotFound { .. } => Reason::NotFound,
            StoreError::AlreadyExists { .. } => Reason::AlreadyExists,
            StoreError::Conflict { .. } => Reason::Conflict,
            StoreError::Serialization(_) | StoreError::LockPoisoned => Reason::Internal,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
