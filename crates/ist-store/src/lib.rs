//! Persistence collaborators for the image stream tag engine.
//!
//! The engine never owns storage. It reads and writes whole
//! [`ImageStream`](ist_types::ImageStream) objects through the
//! [`StreamStore`] trait, whose `update_stream` is a compare-and-swap on the
//! stream's `resourceVersion`, and reads image metadata through
//! [`ImageStore`].
//!
//! # Storage Backends
//!
//! - [`InMemoryStreamStore`] -- `HashMap`-based CAS store for tests and embedding
//! - [`InMemoryImageStore`] -- `HashMap`-based image store
//!
//! # Design Rules
//!
//! 1. Every successful write assigns a fresh, strictly increasing resourceVersion.
//! 2. `update_stream` fails with `Conflict` when the caller's resourceVersion is stale.
//! 3. Reads return owned copies; callers never alias stored state.
//! 4. Missing objects are `Ok(None)` on reads and `NotFound` on writes.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryImageStore, InMemoryStreamStore, StoreSnapshot};
pub use traits::{ImageStore, StreamStore};
