//! Reference parsing for the image stream tag engine.
//!
//! Streams are addressed in three textual forms, and this crate owns all of
//! them:
//!
//! - `"<stream>:<tag>"`: an image stream tag
//! - `"<stream>@<id>"`: an image stream image (`id` is a digest or a prefix of one)
//! - `"[registry/]repository[:tag][@digest]"`: a pull spec
//!
//! A tag reference's `from.name` may additionally carry a namespace
//! (`"<namespace>/<stream>:<tag>"`); [`split_from_name`] resolves it against
//! the owning stream.
//!
//! # Modules
//!
//! - [`error`]: Error types for parsing and validation
//! - [`names`]: Tag and stream name validation
//! - [`parse`]: `stream:tag` / `stream@id` parsing and `from` name splitting
//! - [`reference`]: Pull spec parsing ([`DockerImageReference`])
//! - [`validate`]: Structural validation of [`TagReference`](ist_types::TagReference)s

pub mod error;
pub mod names;
pub mod parse;
pub mod reference;
pub mod validate;

pub use error::{RefError, Result};
pub use names::{validate_stream_name, validate_tag_name};
pub use parse::{
    parse_name_and_id, parse_name_and_tag, split_from_name, split_image_name, ImageTarget,
    TagTarget,
};
pub use reference::DockerImageReference;
pub use validate::validate_tag_reference;
