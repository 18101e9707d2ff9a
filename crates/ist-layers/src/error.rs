use ist_types::Reason;

/// Errors from the layer index and view assembly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    /// The cache has not completed its initial fill.
    #[error("layer index has not finished its initial sync; retry the request")]
    NotSynced,

    #[error("layer index lock poisoned")]
    LockPoisoned,
}

impl LayerError {
    pub fn reason(&self) -> Reason {
        match self {
            LayerError::NotSynced => Reason::ServerTimeout,
            LayerError::LockPoisoned => Reason::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
