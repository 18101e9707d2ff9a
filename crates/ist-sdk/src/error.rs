use ist_types::Reason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("image stream {namespace}/{name} not found")]
    StreamNotFound { namespace: String, name: String },

    #[error("tag {tag:?} not found in image stream {stream}")]
    TagNotFound { stream: String, tag: String },

    #[error("image {0} not found")]
    ImageNotFound(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Reference(#[from] ist_refs::RefError),

    #[error(transparent)]
    History(#[from] ist_history::HistoryError),

    #[error("store error: {0}")]
    Store(#[from] ist_store::StoreError),

    #[error(transparent)]
    Mutation(#[from] ist_mutation::MutationError),

    #[error(transparent)]
    Layers(#[from] ist_layers::LayerError),
}

impl SdkError {
    /// The cross-cutting error class callers branch on.
    pub fn reason(&self) -> Reason {
        match self {
            SdkError::StreamNotFound { .. }
            | SdkError::TagNotFound { .. }
            | SdkError::ImageNotFound(_) => Reason::NotFound,
            SdkError::Invalid(_) => Reason::Invalid,
            SdkError::Config(_) => Reason::Internal,
            SdkError::Reference(e) => e.reason(),
            SdkError::History(e) => e.reason(),
            SdkError::Store(e) => e.reason(),
            SdkError::Mutation(e) => e.reason(),
            SdkError::Layers(e) => e.reason(),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
