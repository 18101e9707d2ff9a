//! Layer index cache and view assembly.
//!
//! A background watcher (outside this crate) keeps a [`LayerIndex`] of image
//! rows keyed by digest. [`ViewAssembler`] walks every image a stream's tag
//! histories mention, manifest-list children included, and folds the rows
//! into an [`ImageStreamLayers`](ist_types::ImageStreamLayers) view.
//!
//! The index may lag behind freshly pushed images. A pass that misses rows
//! waits briefly and is rebuilt once; whatever is still absent is flagged
//! `imageMissing` in the view instead of failing the read.
//!
//! # Key Types
//!
//! - [`LayerIndex`] -- read access to the cache
//! - [`InMemoryLayerIndex`] -- `HashMap`-backed cache for tests and embedding
//! - [`ViewAssembler`] -- builds the view with one delayed retry

pub mod error;
pub mod index;
pub mod view;

pub use error::{LayerError, Result};
pub use index::{InMemoryLayerIndex, LayerIndex};
pub use view::{ViewAssembler, DEFAULT_RETRY_DELAY};
