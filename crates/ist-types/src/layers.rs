//! Layer index rows and the derived per-stream layer view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::image::{Image, LayerDescriptor};

/// One row of the layer index cache, keyed by image digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerEntry {
    /// Image digest (the cache key).
    pub image: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_size: Option<u64>,
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LayerDescriptor>,
    /// Child manifest digests for manifest lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
}

impl LayerEntry {
    /// Derive the cache row for an image.
    pub fn from_image(image: &Image) -> Self {
        Self {
            image: image.name.clone(),
            media_type: image.manifest_media_type.clone(),
            manifest_size: image.manifest_size,
            layers: image.layers.clone(),
            config: image.config.clone(),
            manifests: image.manifests.clone(),
        }
    }
}

/// Size and media type of one blob in the view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub media_type: String,
}

/// Blobs and child manifests referenced by one image in the view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlobReferences {
    /// Layer digests, base first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
    /// The layer index had no row for this image when the view was built.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub image_missing: bool,
}

impl ImageBlobReferences {
    pub fn missing() -> Self {
        Self {
            image_missing: true,
            ..Self::default()
        }
    }
}

/// Aggregate blob view of a stream. Derived on read, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamLayers {
    pub blobs: BTreeMap<String, LayerData>,
    pub images: BTreeMap<String, ImageBlobReferences>,
}

impl ImageStreamLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digests flagged as missing from the layer index.
    pub fn missing_images(&self) -> Vec<&str> {
        self.images
            .iter()
            .filter(|(_, refs)| refs.image_missing)
            .map(|(digest, _)| digest.as_str())
            .collect()
    }
}
