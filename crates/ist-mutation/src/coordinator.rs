use ist_diff::diff_tag_references;
use ist_history::TagEventLog;
use ist_refs::{validate_tag_name, validate_tag_reference};
use ist_resolve::{Propagator, Resolver};
use ist_store::StreamStore;
use ist_types::{Image, ImageStream, TagEvent, TagReference};
use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::error::{MutationError, Result};
use crate::retry::{ConflictAction, ConflictClassifier, RetryPolicy};

/// How a spec tag write treats existing state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagWrite {
    /// Precondition on the stored stream's resourceVersion.
    pub resource_version: Option<String>,
    /// Fail with `AlreadyExists` if the spec tag is already present.
    pub must_not_exist: bool,
}

impl TagWrite {
    /// Create a tag that must not exist yet.
    pub fn create() -> Self {
        Self {
            resource_version: None,
            must_not_exist: true,
        }
    }

    /// Create or replace a tag, optionally guarded by a resourceVersion.
    pub fn update(resource_version: Option<String>) -> Self {
        Self {
            resource_version: resource_version.filter(|rv| !rv.is_empty()),
            must_not_exist: false,
        }
    }
}

/// One read-modify-write target.
struct Target<'r> {
    namespace: &'r str,
    name: &'r str,
    tag: &'r str,
    resource_version: Option<&'r str>,
    create_missing: bool,
    policy: RetryPolicy,
}

impl Target<'_> {
    fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Serializes writes to image streams through compare-and-swap.
pub struct MutationCoordinator<'a, S: StreamStore + ?Sized> {
    streams: &'a S,
    policy: RetryPolicy,
    create_stream_on_missing: bool,
    registry_hostname: Option<String>,
}

impl<'a, S: StreamStore + ?Sized> MutationCoordinator<'a, S> {
    pub fn new(streams: &'a S) -> Self {
        Self {
            streams,
            policy: RetryPolicy::default(),
            create_stream_on_missing: true,
            registry_hostname: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether writes to a missing stream create it.
    pub fn with_create_stream_on_missing(mut self, create: bool) -> Self {
        self.create_stream_on_missing = create;
        self
    }

    /// Snapshot of the internal registry hostname for this call.
    pub fn with_registry_hostname(mut self, hostname: Option<String>) -> Self {
        self.registry_hostname = hostname.filter(|h| !h.is_empty());
        self
    }

    /// Record `image` as the new head of `tag`.
    ///
    /// An image without a pull spec is addressed as
    /// `<repository>@<digest>`. Tags of the same stream that track `tag`
    /// follow the new head in the same write.
    pub fn create_mapping(
        &self,
        namespace: &str,
        name: &str,
        tag: &str,
        image: &Image,
        cancel: &Cancellation,
    ) -> Result<ImageStream> {
        validate_tag_name(tag)?;
        if image.name.is_empty() {
            return Err(MutationError::Invalid {
                message: "a mapping requires an image name".to_string(),
            });
        }
        let target = Target {
            namespace,
            name,
            tag,
            resource_version: None,
            create_missing: self.create_stream_on_missing,
            policy: self.policy,
        };
        let propagator = Propagator::new(Resolver::new(self.streams));

        self.run(&target, cancel, |stream| {
            let reference = self.mapping_reference(stream, image)?;
            let generation = stream.generation() + 1;
            let event = TagEvent::new(reference, image.name.clone()).with_generation(generation);
            if !stream.append(tag, event) {
                return Ok(false);
            }
            stream.metadata.generation = generation;
            if let Some(spec) = stream.spec.tags.get_mut(tag) {
                spec.generation = Some(generation);
            }
            let followed = propagator.propagate_head_change(stream, tag);
            debug!(stream = %stream.key(), tag, image = %image.name, followed = ?followed, "mapped image");
            Ok(true)
        })
    }

    /// Create or replace the spec tag `reference.name`.
    ///
    /// Retargeting a tag bumps the stream generation, stamps the tag, and
    /// resolves the new source. Edits that leave the effective source alone
    /// are stored without a generation bump; an identical tag is not written.
    pub fn create_or_update_tag(
        &self,
        namespace: &str,
        name: &str,
        reference: &TagReference,
        write: &TagWrite,
        cancel: &Cancellation,
    ) -> Result<ImageStream> {
        validate_tag_reference(&reference.name, reference)?;
        let policy = if write.resource_version.is_none() && !write.must_not_exist {
            self.policy.with_classifier(ConflictClassifier::Unconditional)
        } else {
            self.policy
        };
        let target = Target {
            namespace,
            name,
            tag: &reference.name,
            resource_version: write.resource_version.as_deref(),
            create_missing: self.create_stream_on_missing,
            policy,
        };
        let propagator = Propagator::new(Resolver::new(self.streams));

        self.run(&target, cancel, |stream| {
            let tag = reference.name.as_str();
            let existing = stream.spec.tags.get(tag);
            if write.must_not_exist && existing.is_some() {
                return Err(MutationError::TagExists {
                    stream: stream.key(),
                    tag: tag.to_string(),
                });
            }

            let old_tags = stream.spec.tags.clone();
            let mut updated = reference.clone();
            updated.generation = existing.and_then(|t| t.generation);
            stream.spec.tags.insert(tag.to_string(), updated);

            let diff = diff_tag_references(&old_tags, &stream.spec.tags, stream.namespace());
            if diff.is_empty() {
                return Ok(false);
            }
            if !diff.is_effective() {
                debug!(stream = %stream.key(), tag, "tag amended without retargeting");
                return Ok(true);
            }

            let generation = stream.generation() + 1;
            stream.metadata.generation = generation;
            if let Some(stamped) = stream.spec.tags.get_mut(tag) {
                stamped.generation = Some(generation);
            }
            let appended = propagator.apply_spec_diff(stream, &diff, Some(tag))?;
            debug!(stream = %stream.key(), tag, generation, appended = ?appended, "tag retargeted");
            Ok(true)
        })
    }

    /// Remove `tag` from spec and status.
    ///
    /// Fails with `NotFound` if the tag is in neither, or the stream is missing.
    pub fn delete_tag(
        &self,
        namespace: &str,
        name: &str,
        tag: &str,
        cancel: &Cancellation,
    ) -> Result<ImageStream> {
        let target = Target {
            namespace,
            name,
            tag,
            resource_version: None,
            create_missing: false,
            policy: self.policy,
        };
        self.run(&target, cancel, |stream| {
            stream.delete(tag)?;
            stream.metadata.generation += 1;
            Ok(true)
        })
    }

    /// Re-resolve every spec tag of a stream once.
    ///
    /// Brings tracking tags up to date with sources that changed outside the
    /// write that would have propagated them, such as other namespaces.
    pub fn reconcile(&self, namespace: &str, name: &str, cancel: &Cancellation) -> Result<ImageStream> {
        let target = Target {
            namespace,
            name,
            tag: "",
            resource_version: None,
            create_missing: false,
            policy: self.policy.with_classifier(ConflictClassifier::Unconditional),
        };
        let propagator = Propagator::new(Resolver::new(self.streams));
        self.run(&target, cancel, |stream| {
            let generation = stream.generation() + 1;
            stream.metadata.generation = generation;
            let appended = propagator.reconcile(stream);
            if appended.is_empty() {
                return Ok(false);
            }
            debug!(stream = %stream.key(), appended = ?appended, "reconciled tracking tags");
            Ok(true)
        })
    }

    fn mapping_reference(&self, stream: &ImageStream, image: &Image) -> Result<String> {
        if !image.docker_image_reference.is_empty() {
            return Ok(image.docker_image_reference.clone());
        }
        let repository = stream.docker_image_repository(self.registry_hostname.as_deref());
        if repository.is_empty() {
            return Err(MutationError::Invalid {
                message: format!(
                    "image {} has no dockerImageReference and image stream {} has no repository",
                    image.name,
                    stream.key()
                ),
            });
        }
        Ok(format!("{repository}@{}", image.name))
    }

    /// Read, apply, and swap until the write lands or the policy gives up.
    ///
    /// `apply` returns `false` when it changed nothing; the stream is then
    /// returned as read, without a write.
    fn run<F>(&self, target: &Target<'_>, cancel: &Cancellation, mut apply: F) -> Result<ImageStream>
    where
        F: FnMut(&mut ImageStream) -> Result<bool>,
    {
        let mut prefetched: Option<Option<ImageStream>> = None;

        for attempt in 1..=target.policy.max_attempts {
            cancel.check()?;

            let stored = match prefetched.take() {
                Some(stored) => stored,
                None => self.streams.get_stream(target.namespace, target.name)?,
            };
            let (mut stream, exists) = match stored {
                Some(stream) => (stream, true),
                None if target.create_missing && target.resource_version.is_none() => {
                    (ImageStream::new(target.namespace, target.name), false)
                }
                None => {
                    return Err(MutationError::StreamNotFound {
                        namespace: target.namespace.to_string(),
                        name: target.name.to_string(),
                    })
                }
            };

            if let Some(expected) = target.resource_version {
                if stream.metadata.resource_version != expected {
                    return Err(MutationError::PreconditionFailed {
                        stream: target.key(),
                        expected: expected.to_string(),
                        actual: stream.metadata.resource_version.clone(),
                    });
                }
            }

            let seen = stream.history(target.tag).cloned();
            let original = stream.clone();
            if !apply(&mut stream)? {
                debug!(stream = %target.key(), tag = target.tag, "nothing changed; skipping write");
                return Ok(original);
            }
            stream.status.docker_image_repository =
                stream.docker_image_repository(self.registry_hostname.as_deref());

            let written = if exists {
                self.streams.update_stream(&stream)
            } else {
                self.streams.create_stream(&stream)
            };
            let err = match written {
                Ok(stored) => {
                    if !exists {
                        info!(stream = %stored.key(), "created image stream");
                    }
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() || (!exists && e.is_already_exists()) => e,
                Err(e) => return Err(e.into()),
            };

            if target.resource_version.is_some() {
                return Err(MutationError::Conflict {
                    stream: target.key(),
                    tag: target.tag.to_string(),
                });
            }

            let fresh = self.streams.get_stream(target.namespace, target.name)?;
            let action = target
                .policy
                .classify(seen.as_ref(), fresh.as_ref().and_then(|s| s.history(target.tag)));
            match action {
                ConflictAction::Retry => {
                    debug!(stream = %target.key(), tag = target.tag, attempt, error = %err, "write conflicted; retrying");
                    prefetched = Some(fresh);
                }
                ConflictAction::Surface => {
                    debug!(stream = %target.key(), tag = target.tag, attempt, "tag history moved concurrently");
                    return Err(MutationError::Conflict {
                        stream: target.key(),
                        tag: target.tag.to_string(),
                    });
                }
            }
        }

        Err(MutationError::RetriesExhausted {
            stream: target.key(),
            attempts: target.policy.max_attempts,
        })
    }
}
