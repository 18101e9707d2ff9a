use ist_history::resolve_image_id;
use ist_refs::{split_from_name, split_image_name, DockerImageReference};
use ist_store::StreamStore;
use ist_types::{FromKind, ImageStream, TagEvent, TagReference};
use tracing::debug;

use crate::error::{ResolveError, Result};

/// Read access to streams other than the one being resolved.
pub trait StreamLookup: Send + Sync {
    fn lookup_stream(&self, namespace: &str, name: &str) -> Result<Option<ImageStream>>;
}

impl<S: StreamStore + ?Sized> StreamLookup for S {
    fn lookup_stream(&self, namespace: &str, name: &str) -> Result<Option<ImageStream>> {
        Ok(self.get_stream(namespace, name)?)
    }
}

/// Resolves tag references to candidate tag events.
pub struct Resolver<'a, L: StreamLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: StreamLookup + ?Sized> Resolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Resolve `tag` as declared on `owner`.
    ///
    /// Returns `Ok(None)` when the reference has no source or its target tag
    /// has no history yet. Targets in `owner` itself are read from `owner`,
    /// which may hold changes not yet persisted. The returned event has
    /// generation 0; callers stamp it.
    pub fn resolve(&self, owner: &ImageStream, tag: &TagReference) -> Result<Option<TagEvent>> {
        let from = match &tag.from {
            Some(from) if !from.name.is_empty() => from,
            _ => return Ok(None),
        };

        match from.kind {
            FromKind::DockerImage => {
                let reference = DockerImageReference::parse(&from.name)?;
                let image = reference.id.clone().unwrap_or_default();
                Ok(Some(TagEvent::new(from.name.clone(), image)))
            }
            FromKind::ImageStreamTag => {
                let target = split_from_name(
                    &from.name,
                    from.namespace.as_deref(),
                    owner.namespace(),
                    owner.name(),
                )?;
                let event = if target.is_stream(owner.namespace(), owner.name()) {
                    owner.latest(&target.tag).cloned()
                } else {
                    let source = self.source_stream(&target.namespace, &target.stream, &tag.name)?;
                    source.latest(&target.tag).cloned()
                };
                if event.is_none() {
                    debug!(
                        stream = %owner.key(),
                        tag = %tag.name,
                        source = %from.name,
                        "source tag has no history yet"
                    );
                }
                Ok(event.map(|e| TagEvent::new(e.docker_image_reference, e.image)))
            }
            FromKind::ImageStreamImage => {
                let target =
                    split_image_name(&from.name, from.namespace.as_deref(), owner.namespace())?;
                let event = if target.namespace == owner.namespace() && target.stream == owner.name() {
                    resolve_image_id(owner, &target.id)?
                } else {
                    let source = self.source_stream(&target.namespace, &target.stream, &tag.name)?;
                    resolve_image_id(&source, &target.id)?
                };
                Ok(Some(event))
            }
        }
    }

    fn source_stream(&self, namespace: &str, name: &str, tag: &str) -> Result<ImageStream> {
        self.lookup
            .lookup_stream(namespace, name)?
            .ok_or_else(|| ResolveError::StreamNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
                tag: tag.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ist_history::TagEventLog;
    use ist_store::InMemoryStreamStore;
    use ist_types::{ObjectReference, Reason};

    const D1: &str = "sha256:1111aaaa";
    const D2: &str = "sha256:2222bbbb";

    fn tag(name: &str, from: ObjectReference) -> TagReference {
        TagReference::new(name).with_from(from)
    }

    fn shared_store() -> InMemoryStreamStore {
        let store = InMemoryStreamStore::new();
        let mut base = ImageStream::new("shared", "base");
        base.append("stable", TagEvent::new(format!("reg/shared/base@{D1}"), D1));
        base.append("v2", TagEvent::new(format!("reg/shared/base@{D2}"), D2));
        store.create_stream(&base).unwrap();
        store
    }

    #[test]
    fn no_source_resolves_to_nothing() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        assert!(resolver.resolve(&owner, &TagReference::new("t")).unwrap().is_none());
        let empty = tag("t", ObjectReference::docker_image(""));
        assert!(resolver.resolve(&owner, &empty).unwrap().is_none());
    }

    #[test]
    fn docker_image_by_tag() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let event = resolver
            .resolve(&owner, &tag("t1", ObjectReference::docker_image("B")))
            .unwrap()
            .unwrap();
        assert_eq!(event.docker_image_reference, "B");
        assert_eq!(event.image, "");
    }

    #[test]
    fn docker_image_by_digest_carries_image() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let pull_spec = format!("quay.io/org/app@{D1}");
        let event = resolver
            .resolve(&owner, &tag("t", ObjectReference::docker_image(pull_spec.clone())))
            .unwrap()
            .unwrap();
        assert_eq!(event.docker_image_reference, pull_spec);
        assert_eq!(event.image, D1);
    }

    #[test]
    fn malformed_pull_spec_is_bad_request() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let err = resolver
            .resolve(&owner, &tag("t", ObjectReference::docker_image("bad ref")))
            .unwrap_err();
        assert_eq!(err.reason(), Reason::BadRequest);
    }

    #[test]
    fn same_stream_tag_reads_in_flight_owner() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let mut owner = ImageStream::new("test", "is");
        owner.append("latest", TagEvent::new("reg/test/is@x", "x"));

        let event = resolver
            .resolve(&owner, &tag("prod", ObjectReference::image_stream_tag("latest")))
            .unwrap()
            .unwrap();
        assert_eq!(event.image, "x");
        assert_eq!(event.docker_image_reference, "reg/test/is@x");
    }

    #[test]
    fn source_without_history_resolves_to_nothing() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let resolved = resolver
            .resolve(&owner, &tag("prod", ObjectReference::image_stream_tag("is:latest")))
            .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn cross_namespace_tag() {
        let store = shared_store();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");

        let embedded = tag("t", ObjectReference::image_stream_tag("shared/base:stable"));
        assert_eq!(resolver.resolve(&owner, &embedded).unwrap().unwrap().image, D1);

        let via_field =
            tag("t", ObjectReference::image_stream_tag("base:v2").in_namespace("shared"));
        assert_eq!(resolver.resolve(&owner, &via_field).unwrap().unwrap().image, D2);
    }

    #[test]
    fn missing_source_stream_is_not_found() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let err = resolver
            .resolve(&owner, &tag("t", ObjectReference::image_stream_tag("other:latest")))
            .unwrap_err();
        assert!(matches!(err, ResolveError::StreamNotFound { ref tag, .. } if tag == "t"));
        assert_eq!(err.reason(), Reason::NotFound);
    }

    #[test]
    fn image_stream_image_by_prefix() {
        let store = shared_store();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let event = resolver
            .resolve(&owner, &tag("t", ObjectReference::image_stream_image("shared/base@2222")))
            .unwrap()
            .unwrap();
        assert_eq!(event.image, D2);
    }

    #[test]
    fn image_stream_image_unknown_id() {
        let store = shared_store();
        let resolver = Resolver::new(&store);
        let owner = ImageStream::new("test", "is");
        let err = resolver
            .resolve(&owner, &tag("t", ObjectReference::image_stream_image("shared/base@ffff")))
            .unwrap_err();
        assert_eq!(err.reason(), Reason::NotFound);
    }

    #[test]
    fn resolution_is_stable() {
        let store = InMemoryStreamStore::new();
        let resolver = Resolver::new(&store);
        let mut owner = ImageStream::new("test", "is");
        let reference = tag("t", ObjectReference::docker_image("nginx:1.25"));

        let first = resolver.resolve(&owner, &reference).unwrap().unwrap();
        assert!(owner.append("t", first));
        let second = resolver.resolve(&owner, &reference).unwrap().unwrap();
        assert!(!owner.append("t", second));
        assert_eq!(owner.history("t").unwrap().len(), 1);
    }
}
