use ist_history::compare_histories;
use ist_types::TagEventList;

/// Attempts per call before giving up with `ServerTimeout`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// How a lost compare-and-swap is judged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictClassifier {
    /// Retry only if the affected tag's history is unchanged in the fresh stream.
    TagHistory,
    /// Retry every conflict. Used for updates that carry no resourceVersion.
    Unconditional,
}

/// Outcome of classifying a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictAction {
    Retry,
    Surface,
}

/// Bounded retry for optimistic-concurrency conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub classifier: ConflictClassifier,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, classifier: ConflictClassifier) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            classifier,
        }
    }

    /// The same budget with a different classifier.
    pub fn with_classifier(self, classifier: ConflictClassifier) -> Self {
        Self { classifier, ..self }
    }

    /// Decide what to do after losing a swap.
    ///
    /// `seen` is the affected tag's history in the stream the attempt was
    /// built from; `fresh` is its history as now stored. Histories are
    /// compared position by position.
    pub fn classify(&self, seen: Option<&TagEventList>, fresh: Option<&TagEventList>) -> ConflictAction {
        match self.classifier {
            ConflictClassifier::Unconditional => ConflictAction::Retry,
            ConflictClassifier::TagHistory if compare_histories(seen, fresh).changed => {
                ConflictAction::Surface
            }
            ConflictClassifier::TagHistory => ConflictAction::Retry,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, ConflictClassifier::TagHistory)
    }
}
