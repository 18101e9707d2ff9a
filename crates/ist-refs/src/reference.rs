//! Pull spec parsing.
//!
//! Parses references like `quay.io/org/app:v1` or
//! `registry:5000/ns/app@sha256:...` into structured components.

use std::fmt;

use ist_types::Digest;
use serde::{Deserialize, Serialize};

use crate::error::{RefError, Result};

/// Parsed pull spec.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerImageReference {
    /// Registry host (with optional port); empty when the pull spec names none.
    pub registry: String,
    /// Repository path (e.g. `library/nginx`, `ns/app`).
    pub repository: String,
    pub tag: Option<String>,
    /// Content digest when the pull spec is pinned.
    pub id: Option<String>,
}

impl DockerImageReference {
    /// Parse a pull spec.
    ///
    /// Supports:
    /// - `nginx`, `nginx:1.25`
    /// - `org/app`, `org/app:tag`
    /// - `quay.io/org/app:tag`, `localhost:5000/app`
    /// - `registry:5000/ns/app@sha256:abc...` (optionally with a tag before `@`)
    pub fn parse(input: &str) -> Result<Self> {
        let spec = input.trim();
        if spec.is_empty() {
            return Err(RefError::malformed(input, "empty pull spec"));
        }
        if spec.chars().any(char::is_whitespace) {
            return Err(RefError::malformed(input, "pull spec contains whitespace"));
        }

        let (name_tag, id) = match spec.split_once('@') {
            Some((name_tag, digest)) => {
                if digest.contains('@') {
                    return Err(RefError::malformed(input, "more than one '@'"));
                }
                if !Digest::is_digest(digest) {
                    return Err(RefError::malformed(
                        input,
                        "expected algorithm:hex after '@'",
                    ));
                }
                (name_tag, Some(digest.to_string()))
            }
            None => (spec, None),
        };

        // The tag separator is the last ':' after the last '/'; an earlier ':'
        // belongs to a registry port.
        let last_slash = name_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_slash..].rfind(':') {
            Some(pos) => {
                let split = last_slash + pos;
                let tag = &name_tag[split + 1..];
                if tag.is_empty() {
                    return Err(RefError::malformed(input, "empty tag after ':'"));
                }
                (&name_tag[..split], Some(tag.to_string()))
            }
            None => (name_tag, None),
        };

        let (registry, repository) = split_registry(name);
        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(RefError::malformed(input, "empty repository component"));
        }

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag,
            id,
        })
    }

    /// Returns `true` if the pull spec is pinned by digest.
    pub fn is_digest(&self) -> bool {
        self.id.is_some()
    }

    /// The repository portion including registry (`registry/repository`).
    pub fn repository_name(&self) -> String {
        if self.registry.is_empty() {
            self.repository.clone()
        } else {
            format!("{}/{}", self.registry, self.repository)
        }
    }

    /// Copy of this reference pinned to `digest`, with any tag dropped.
    pub fn with_digest(&self, digest: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            id: Some(digest.to_string()),
        }
    }

    /// Canonical string form.
    pub fn exact(&self) -> String {
        let mut s = self.repository_name();
        if let Some(tag) = &self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(id) = &self.id {
            s.push('@');
            s.push_str(id);
        }
        s
    }
}

impl fmt::Display for DockerImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exact())
    }
}

/// The first component is a registry if it looks like a host.
fn split_registry(name: &str) -> (&str, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first, rest)
        }
        _ => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:4d3bd1d2b1a7d2f0a8d4b3c5e6f70819a2b3c4d5e6f708192a3b4c5d6e7f8091";

    #[test]
    fn parse_simple_name() {
        let r = DockerImageReference::parse("nginx").unwrap();
        assert_eq!(r.registry, "");
        assert_eq!(r.repository, "nginx");
        assert!(r.tag.is_none());
        assert!(!r.is_digest());
    }

    #[test]
    fn parse_with_tag() {
        let r = DockerImageReference::parse("nginx:1.25").unwrap();
        assert_eq!(r.repository, "nginx");
        assert_eq!(r.tag.as_deref(), Some("1.25"));
    }

    #[test]
    fn parse_registry_with_port() {
        let r = DockerImageReference::parse("registry:5000/ns/app:v1").unwrap();
        assert_eq!(r.registry, "registry:5000");
        assert_eq!(r.repository, "ns/app");
        assert_eq!(r.tag.as_deref(), Some("v1"));

        let r = DockerImageReference::parse("localhost:5000/app").unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert!(r.tag.is_none());
    }

    #[test]
    fn parse_digest() {
        let spec = format!("quay.io/org/app@{DIGEST}");
        let r = DockerImageReference::parse(&spec).unwrap();
        assert_eq!(r.registry, "quay.io");
        assert_eq!(r.repository, "org/app");
        assert_eq!(r.id.as_deref(), Some(DIGEST));
        assert!(r.is_digest());
        assert_eq!(r.exact(), spec);
    }

    #[test]
    fn parse_tag_and_digest() {
        let spec = format!("quay.io/org/app:v1@{DIGEST}");
        let r = DockerImageReference::parse(&spec).unwrap();
        assert_eq!(r.tag.as_deref(), Some("v1"));
        assert!(r.is_digest());
    }

    #[test]
    fn org_without_dot_is_not_registry() {
        let r = DockerImageReference::parse("library/nginx").unwrap();
        assert_eq!(r.registry, "");
        assert_eq!(r.repository, "library/nginx");
    }

    #[test]
    fn reject_malformed_specs() {
        for bad in ["", "  ", "app@", "app@notadigest", "a@sha256:aa@sha256:bb", "app:", "quay.io//app", "has space"] {
            assert!(DockerImageReference::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn with_digest_drops_tag() {
        let r = DockerImageReference::parse("registry:5000/ns/app:v1").unwrap();
        let pinned = r.with_digest("sha256:deadbeef");
        assert_eq!(pinned.exact(), "registry:5000/ns/app@sha256:deadbeef");
    }
}
