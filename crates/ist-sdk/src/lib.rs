//! High-level API for the image stream tag engine.
//!
//! [`Engine`] is the entry point for embedding the engine. It serves the
//! resources the engine exposes upward (image stream tags, image stream
//! images, mappings, and the layer view) over pluggable stream, image, and
//! layer stores.

pub mod config;
pub mod engine;
pub mod error;
pub mod hostname;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{SdkError, SdkResult};
pub use hostname::{RegistryHostnameSource, StaticHostname};

// Re-export key types
pub use ist_layers::{InMemoryLayerIndex, LayerIndex};
pub use ist_mutation::Cancellation;
pub use ist_store::{ImageStore, InMemoryImageStore, InMemoryStreamStore, StreamStore};
pub use ist_types::{
    Image, ImageStream, ImageStreamImage, ImageStreamLayers, ImageStreamMapping, ImageStreamTag,
    ObjectReference, Reason, TagReference,
};
