use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Media type of a single-platform Docker schema 2 manifest.
pub const MEDIA_TYPE_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// Media type of a Docker manifest list.
pub const MEDIA_TYPE_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// Media type of a gzip-compressed layer.
pub const MEDIA_TYPE_LAYER_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
/// Media type of an image config blob.
pub const MEDIA_TYPE_CONFIG: &str = "application/vnd.docker.container.image.v1+json";

/// A blob referenced by a manifest (layer or config).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Blob digest.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub media_type: String,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            media_type: media_type.into(),
        }
    }
}

/// Image metadata as held by the image store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// The image digest.
    pub name: String,
    /// Pull spec recorded when the image was imported or pushed.
    #[serde(default)]
    pub docker_image_reference: String,
    #[serde(default)]
    pub manifest_media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_size: Option<u64>,
    /// Ordered layers, base first.
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LayerDescriptor>,
    /// Child manifest digests; non-empty only for manifest lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Image {
    /// A single-platform image with no layers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docker_image_reference: String::new(),
            manifest_media_type: MEDIA_TYPE_MANIFEST_V2.to_string(),
            manifest_size: None,
            layers: Vec::new(),
            config: None,
            manifests: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_reference(mut self, docker_image_reference: impl Into<String>) -> Self {
        self.docker_image_reference = docker_image_reference.into();
        self
    }

    pub fn with_layers(mut self, layers: Vec<LayerDescriptor>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_config(mut self, config: LayerDescriptor) -> Self {
        self.config = Some(config);
        self
    }

    /// Turn this image into a manifest list over `children`.
    pub fn with_manifests(mut self, children: Vec<String>) -> Self {
        self.manifest_media_type = MEDIA_TYPE_MANIFEST_LIST.to_string();
        self.manifests = children;
        self
    }

    pub fn is_manifest_list(&self) -> bool {
        !self.manifests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_manifest_list_media_type() {
        let list = Image::new("sha256:aa").with_manifests(vec!["sha256:bb".into()]);
        assert!(list.is_manifest_list());
        assert_eq!(list.manifest_media_type, MEDIA_TYPE_MANIFEST_LIST);

        let single = Image::new("sha256:cc");
        assert!(!single.is_manifest_list());
        assert_eq!(single.manifest_media_type, MEDIA_TYPE_MANIFEST_V2);
    }

    #[test]
    fn deserialize_minimal_image() {
        let img: Image = serde_json::from_str(r#"{"name":"sha256:aa"}"#).unwrap();
        assert_eq!(img.name, "sha256:aa");
        assert!(img.layers.is_empty());
        assert!(img.config.is_none());
    }
}
