//! The image stream object: desired tag references plus observed histories.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{TagEvent, TagEventList};
use crate::tag::TagReference;

/// Object metadata managed by the persistence collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    /// Opaque compare-and-swap token. Empty on objects not yet persisted.
    #[serde(default)]
    pub resource_version: String,
    /// Bumped by exactly one on every effective mutation.
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamSpec {
    /// Optional upstream repository this stream mirrors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_repository: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, TagReference>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    /// Registry-qualified repository used when a tag lacks an explicit pull spec.
    #[serde(default)]
    pub docker_image_repository: String,
    #[serde(default)]
    pub tags: BTreeMap<String, TagEventList>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStream {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageStreamSpec,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

impl ImageStream {
    /// A new, never-persisted stream with no tags.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.into(),
                name: name.into(),
                ..ObjectMeta::default()
            },
            spec: ImageStreamSpec::default(),
            status: ImageStreamStatus::default(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn generation(&self) -> u64 {
        self.metadata.generation
    }

    /// `namespace/name`, used in logs and error messages.
    pub fn key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    pub fn spec_tag(&self, tag: &str) -> Option<&TagReference> {
        self.spec.tags.get(tag)
    }

    pub fn history(&self, tag: &str) -> Option<&TagEventList> {
        self.status.tags.get(tag)
    }

    /// Latest event of `tag`, if any.
    pub fn latest(&self, tag: &str) -> Option<&TagEvent> {
        self.status.tags.get(tag).and_then(TagEventList::latest)
    }

    /// The repository pull specs of this stream are rooted at.
    ///
    /// With an internal registry hostname this is `<hostname>/<ns>/<name>`;
    /// otherwise the upstream repository from the spec, or empty.
    pub fn docker_image_repository(&self, registry_hostname: Option<&str>) -> String {
        match registry_hostname.filter(|h| !h.is_empty()) {
            Some(host) => format!("{host}/{}/{}", self.metadata.namespace, self.metadata.name),
            None => self.spec.docker_image_repository.clone().unwrap_or_default(),
        }
    }

    /// All tag names present in either spec or status, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .spec
            .tags
            .keys()
            .chain(self.status.tags.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
