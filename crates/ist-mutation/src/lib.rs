//! Mutation coordinator for the image stream tag engine.
//!
//! Every write to a stream is a read-modify-write cycle closed by a
//! compare-and-swap on the stream's resourceVersion. When the swap loses a
//! race, the [`RetryPolicy`] decides whether to re-read and try again or to
//! surface the conflict:
//!
//! - Another writer left the affected tag's history as we saw it: retry.
//! - Another writer moved the affected tag's history: surface `Conflict`.
//! - The attempt budget is spent: surface `ServerTimeout`.
//!
//! # Key Types
//!
//! - [`MutationCoordinator`] -- create-mapping, create-or-update-tag, delete-tag
//! - [`RetryPolicy`] / [`ConflictClassifier`] -- the retry decision as a value
//! - [`Cancellation`] -- caller-driven abort checked before every attempt

pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod retry;

pub use cancel::Cancellation;
pub use coordinator::{MutationCoordinator, TagWrite};
pub use error::{MutationError, Result};
pub use retry::{ConflictAction, ConflictClassifier, RetryPolicy};
