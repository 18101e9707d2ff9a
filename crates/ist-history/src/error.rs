use ist_types::Reason;

/// Errors produced by tag history operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("tag {tag:?} not found in image stream {stream}")]
    TagNotFound { stream: String, tag: String },

    #[error("no image matching {id:?} in image stream {stream}")]
    ImageNotFound { stream: String, id: String },

    #[error("multiple images in image stream {stream} match the prefix {id:?}: {}", matches.join(", "))]
    AmbiguousImage {
        stream: String,
        id: String,
        matches: Vec<String>,
    },
}

impl HistoryError {
    pub fn reason(&self) -> Reason {
        match self {
            HistoryError::TagNotFound { .. } | HistoryError::ImageNotFound { .. } => {
                Reason::NotFound
            }
            HistoryError::AmbiguousImage { .. } => Reason::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
