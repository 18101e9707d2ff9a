//! Append-only tag event log for the image stream tag engine.
//!
//! Every tag in a stream's status carries a newest-first history of
//! [`TagEvent`](ist_types::TagEvent)s. This crate provides:
//! - The [`TagEventLog`] trait: append with no-op detection, latest, delete
//! - [`compare_histories`]: positional comparison yielding `(changed, deleted)`
//! - [`resolve_image_id`]: exact or prefix lookup of an image across all histories
//!
//! Histories are only ever extended at the head or discarded whole with their
//! tag; no entry is edited in place.

pub mod error;
pub mod log;
pub mod lookup;

pub use error::{HistoryError, Result};
pub use log::{compare_histories, HistoryChange, TagEventLog};
pub use lookup::resolve_image_id;
