use ist_history::HistoryError;
use ist_refs::RefError;
use ist_store::StoreError;
use ist_types::Reason;

/// Errors produced while resolving a tag reference.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Reference(#[from] RefError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("reading source stream: {0}")]
    Store(#[from] StoreError),

    /// The stream a reference points at does not exist.
    #[error("image stream {namespace}/{name} referenced by tag {tag:?} not found")]
    StreamNotFound {
        namespace: String,
        name: String,
        tag: String,
    },
}

impl ResolveError {
    pub fn reason(&self) -> Reason {
        match self {
            ResolveError::Reference(e) => e.reason(),
            ResolveError::History(e) => e.reason(),
            ResolveError::Store(e) => e.reason(),
            ResolveError::StreamNotFound { .. } => Reason::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
