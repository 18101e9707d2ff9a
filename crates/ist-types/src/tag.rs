//! Tag references: the declared (desired) source of a tag.
//!
//! A tag reference lives in a stream's `spec.tags` map. Its `from` names one
//! of three kinds of source; the resolver turns that source into a concrete
//! [`TagEvent`](crate::TagEvent) in the tag's history.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of object a tag's `from` points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FromKind {
    /// A literal pull spec (`registry/repo:tag` or `registry/repo@sha256:...`).
    DockerImage,
    /// Another tag, `[namespace/]stream:tag` (or a bare `tag` in the same stream).
    ImageStreamTag,
    /// A specific image in a stream's history, `stream@id`.
    ImageStreamImage,
}

impl FromKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FromKind::DockerImage => "DockerImage",
            FromKind::ImageStreamTag => "ImageStreamTag",
            FromKind::ImageStreamImage => "ImageStreamImage",
        }
    }
}

impl fmt::Display for FromKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FromKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DockerImage" => Ok(FromKind::DockerImage),
            "ImageStreamTag" => Ok(FromKind::ImageStreamTag),
            "ImageStreamImage" => Ok(FromKind::ImageStreamImage),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Pointer from a tag reference to its source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: FromKind,
    /// Namespace of the target; `None` or empty means the owning stream's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectReference {
    pub fn new(kind: FromKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: None,
            name: name.into(),
        }
    }

    pub fn docker_image(name: impl Into<String>) -> Self {
        Self::new(FromKind::DockerImage, name)
    }

    pub fn image_stream_tag(name: impl Into<String>) -> Self {
        Self::new(FromKind::ImageStreamTag, name)
    }

    pub fn image_stream_image(name: impl Into<String>) -> Self {
        Self::new(FromKind::ImageStreamImage, name)
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The namespace this reference targets, defaulting to `owner`.
    pub fn effective_namespace<'a>(&'a self, owner: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => owner,
        }
    }
}

/// Import settings carried on a tag reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagImportPolicy {
    /// Allow importing from registries without verified TLS.
    pub insecure: bool,
    /// Periodically re-import the source.
    pub scheduled: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferencePolicyType {
    /// Consumers pull from the source registry.
    #[default]
    Source,
    /// Consumers pull through the integrated registry.
    Local,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagReferencePolicy {
    #[serde(rename = "type")]
    pub kind: ReferencePolicyType,
}

/// One entry in a stream's `spec.tags` map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
    pub name: String,
    /// The declared source. `None` makes the entry a no-op placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,
    /// Stream generation at which this reference was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    #[serde(default)]
    pub import_policy: TagImportPolicy,
    #[serde(default)]
    pub reference_policy: TagReferencePolicy,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl TagReference {
    /// A tag reference with no source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: None,
            generation: None,
            import_policy: TagImportPolicy::default(),
            reference_policy: TagReferencePolicy::default(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_from(mut self, from: ObjectReference) -> Self {
        self.from = Some(from);
        self
    }

    /// Returns `true` if this tag copies events from another tag.
    pub fn is_tracking(&self) -> bool {
        matches!(&self.from, Some(from) if from.kind == FromKind::ImageStreamTag)
    }
}
