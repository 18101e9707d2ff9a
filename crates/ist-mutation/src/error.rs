use ist_history::HistoryError;
use ist_refs::RefError;
use ist_resolve::ResolveError;
use ist_store::StoreError;
use ist_types::Reason;

/// Errors returned by the mutation coordinator.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Reference(#[from] RefError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("image stream {namespace}/{name} not found")]
    StreamNotFound { namespace: String, name: String },

    #[error("tag {tag:?} already exists in image stream {stream}")]
    TagExists { stream: String, tag: String },

    /// Another writer changed the history of the tag being mutated.
    #[error("tag {tag:?} of image stream {stream} was changed concurrently; retry the request")]
    Conflict { stream: String, tag: String },

    /// The caller's resourceVersion no longer matches the stored stream.
    #[error("image stream {stream} has resourceVersion {actual:?}, not {expected:?}")]
    PreconditionFailed {
        stream: String,
        expected: String,
        actual: String,
    },

    #[error("{message}")]
    Invalid { message: String },

    #[error("gave up updating image stream {stream} after {attempts} conflicting writes; retry the request")]
    RetriesExhausted { stream: String, attempts: u32 },

    #[error("request cancelled")]
    Cancelled,
}

impl MutationError {
    pub fn reason(&self) -> Reason {
        match self {
            MutationError::Reference(e) => e.reason(),
            MutationError::Resolve(e) => e.reason(),
            MutationError::History(e) => e.reason(),
            MutationError::Store(e) => e.reason(),
            MutationError::StreamNotFound { .. } => Reason::NotFound,
            MutationError::TagExists { .. } => Reason::AlreadyExists,
            MutationError::Conflict { .. } | MutationError::PreconditionFailed { .. } => {
                Reason::Conflict
            }
            MutationError::Invalid { .. } => Reason::Invalid,
            MutationError::RetriesExhausted { .. } => Reason::ServerTimeout,
            MutationError::Cancelled => Reason::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, MutationError>;
