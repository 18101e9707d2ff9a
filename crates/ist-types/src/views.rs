//! Derived resources served upward: image stream tags, image stream images,
//! and the image stream mapping input.

use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::tag::TagReference;

/// A single tag of a stream, addressed as `<stream>:<tag>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamTag {
    pub namespace: String,
    /// `<stream>:<tag>`.
    pub name: String,
    /// Stream resourceVersion the view was read at.
    #[serde(default)]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagReference>,
    /// Image the tag currently points at, if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    /// Generation of the latest history event.
    #[serde(default)]
    pub generation: u64,
}

impl ImageStreamTag {
    pub fn new(namespace: impl Into<String>, stream: &str, tag: &str) -> Self {
        Self {
            namespace: namespace.into(),
            name: format!("{stream}:{tag}"),
            resource_version: String::new(),
            tag: None,
            image: None,
            generation: 0,
        }
    }

    pub fn with_tag(mut self, tag: TagReference) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// A specific image in a stream, addressed as `<stream>@<id>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamImage {
    pub namespace: String,
    /// `<stream>@<digest>`.
    pub name: String,
    pub image: Image,
}

/// Input binding an image to a tag in one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamMapping {
    pub namespace: String,
    /// Stream name.
    pub name: String,
    pub tag: String,
    pub image: Image,
}
