//! Foundation types for the image stream tag engine.
//!
//! This crate provides the data model shared by every other `ist-*` crate:
//! image streams with their desired tag references and observed tag
//! histories, images and their layer descriptors, and the derived views the
//! engine serves upward.
//!
//! # Key Types
//!
//! - [`ImageStream`]: a tag-reference map (spec) paired with a tag-history map (status)
//! - [`TagReference`]: the declared source of a tag
//! - [`TagEvent`] / [`TagEventList`]: one resolved binding / the newest-first history
//! - [`Digest`]: parsed `algorithm:hex` content digest
//! - [`Image`]: image metadata including layers and manifest-list children
//! - [`LayerEntry`]: one row of the layer index cache
//! - [`ImageStreamLayers`]: the derived blob/manifest view of a stream
//! - [`Reason`]: the error taxonomy every crate maps its errors onto

pub mod digest;
pub mod error;
pub mod event;
pub mod image;
pub mod layers;
pub mod stream;
pub mod tag;
pub mod views;

pub use digest::Digest;
pub use error::{Reason, TypeError};
pub use event::{TagEvent, TagEventList};
pub use image::{Image, LayerDescriptor};
pub use layers::{ImageBlobReferences, ImageStreamLayers, LayerData, LayerEntry};
pub use stream::{ImageStream, ImageStreamSpec, ImageStreamStatus, ObjectMeta};
pub use tag::{FromKind, ObjectReference, ReferencePolicyType, TagImportPolicy, TagReference, TagReferencePolicy};
pub use views::{ImageStreamImage, ImageStreamMapping, ImageStreamTag};
