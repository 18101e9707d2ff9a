use std::collections::BTreeSet;

use ist_diff::SpecDiff;
use ist_history::TagEventLog;
use ist_refs::split_from_name;
use ist_types::{FromKind, ImageStream, TagReference};
use tracing::{debug, warn};

use crate::error::Result;
use crate::resolver::{Resolver, StreamLookup};

/// Applies resolved tag events to a stream being mutated.
///
/// Events are stamped with the stream's current generation, so callers bump
/// the generation before propagating. Each entry point walks the tracking
/// graph forward a single step: a tag that changes because it tracks another
/// tag does not in turn update its own trackers until the next pass.
pub struct Propagator<'a, L: StreamLookup + ?Sized> {
    resolver: Resolver<'a, L>,
}

impl<'a, L: StreamLookup + ?Sized> Propagator<'a, L> {
    pub fn new(resolver: Resolver<'a, L>) -> Self {
        Self { resolver }
    }

    /// Resolve every added or retargeted tag in `diff`, then forward new
    /// heads to the tags that track them.
    ///
    /// A failure to resolve `edited` is returned; failures on other tags are
    /// logged and skipped. Returns the tags whose history grew.
    pub fn apply_spec_diff(
        &self,
        stream: &mut ImageStream,
        diff: &SpecDiff,
        edited: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut heads = BTreeSet::new();
        for tag in diff.tags_to_resolve() {
            match self.resolve_and_append(stream, tag) {
                Ok(true) => {
                    heads.insert(tag.to_string());
                }
                Ok(false) => {}
                Err(e) if edited == Some(tag) => return Err(e),
                Err(e) => {
                    warn!(stream = %stream.key(), tag, error = %e, "skipping tag that failed to resolve");
                }
            }
        }

        let mut appended: Vec<String> = heads.iter().cloned().collect();
        appended.extend(self.follow(stream, &heads, |tag| diff.touches(tag)));
        Ok(appended)
    }

    /// Forward the new head of `tag` to the tags of the same stream that
    /// track it. Returns the tags whose history grew.
    pub fn propagate_head_change(&self, stream: &mut ImageStream, tag: &str) -> Vec<String> {
        let heads = BTreeSet::from([tag.to_string()]);
        self.follow(stream, &heads, |_| false)
    }

    /// Re-resolve spec tags once, in name order.
    ///
    /// Tracking tags are always re-resolved. Other tags are only resolved
    /// while their spec is newer than their head, so a head moved by a
    /// mapping is not overwritten by the declared source. Tracking cycles and
    /// chains converge over repeated calls.
    pub fn reconcile(&self, stream: &mut ImageStream) -> Vec<String> {
        let view: &ImageStream = stream;
        let tags: Vec<String> = view
            .spec
            .tags
            .values()
            .filter(|r| needs_reconcile(view, r))
            .map(|r| r.name.clone())
            .collect();
        let mut appended = Vec::new();
        for tag in tags {
            match self.resolve_and_append(stream, &tag) {
                Ok(true) => appended.push(tag),
                Ok(false) => {}
                Err(e) => {
                    warn!(stream = %stream.key(), tag = %tag, error = %e, "reconcile could not resolve tag");
                }
            }
        }
        appended
    }

    fn resolve_and_append(&self, stream: &mut ImageStream, tag: &str) -> Result<bool> {
        let Some(reference) = stream.spec_tag(tag).cloned() else {
            return Ok(false);
        };
        let Some(event) = self.resolver.resolve(stream, &reference)? else {
            return Ok(false);
        };
        let event = event.with_generation(stream.generation());
        Ok(stream.append(tag, event))
    }

    fn follow(
        &self,
        stream: &mut ImageStream,
        heads: &BTreeSet<String>,
        skip: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        if heads.is_empty() {
            return Vec::new();
        }
        let view: &ImageStream = stream;
        let trackers: Vec<String> = view
            .spec
            .tags
            .values()
            .filter(|r| !heads.contains(&r.name) && !skip(&r.name))
            .filter(|r| tracks_any(view, r, heads))
            .map(|r| r.name.clone())
            .collect();

        let mut appended = Vec::new();
        for tag in trackers {
            match self.resolve_and_append(stream, &tag) {
                Ok(true) => {
                    debug!(stream = %stream.key(), tag = %tag, "propagated new head to tracking tag");
                    appended.push(tag);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(stream = %stream.key(), tag = %tag, error = %e, "skipping tracking tag that failed to resolve");
                }
            }
        }
        appended
    }
}

fn needs_reconcile(stream: &ImageStream, reference: &TagReference) -> bool {
    if reference.is_tracking() {
        return true;
    }
    match stream.latest(&reference.name) {
        None => true,
        Some(head) => reference.generation.unwrap_or(0) > head.generation,
    }
}

/// Returns `true` if `reference` is an `ImageStreamTag` source pointing at
/// one of `heads` in `stream` itself.
fn tracks_any(stream: &ImageStream, reference: &TagReference, heads: &BTreeSet<String>) -> bool {
    let Some(from) = &reference.from else {
        return false;
    };
    if from.kind != FromKind::ImageStreamTag || from.name.is_empty() {
        return false;
    }
    match split_from_name(
        &from.name,
        from.namespace.as_deref(),
        stream.namespace(),
        stream.name(),
    ) {
        Ok(target) => target.is_stream(stream.namespace(), stream.name()) && heads.contains(&target.tag),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ist_diff::diff_tag_references;
    use ist_store::{InMemoryStreamStore, StreamStore};
    use ist_types::{ObjectReference, TagEvent};

    fn istag(name: &str, from: &str) -> TagReference {
        TagReference::new(name).with_from(ObjectReference::image_stream_tag(from))
    }

    fn docker(name: &str, from: &str) -> TagReference {
        TagReference::new(name).with_from(ObjectReference::docker_image(from))
    }

    fn set_spec(stream: &mut ImageStream, refs: Vec<TagReference>) -> SpecDiff {
        let old = stream.spec.tags.clone();
        for r in refs {
            stream.spec.tags.insert(r.name.clone(), r);
        }
        diff_tag_references(&old, &stream.spec.tags, "test")
    }

    #[test]
    fn retarget_prepends_new_event() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream.spec.tags.insert("t1".into(), docker("t1", "A"));
        stream.append("t1", TagEvent::new("", "A"));

        stream.metadata.generation = 2;
        let diff = set_spec(&mut stream, vec![docker("t1", "B")]);
        let appended = propagator.apply_spec_diff(&mut stream, &diff, Some("t1")).unwrap();
        assert_eq!(appended, vec!["t1"]);

        let items = stream.history("t1").unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].docker_image_reference, "B");
        assert_eq!(items[0].image, "");
        assert_eq!(items[0].generation, 2);
        assert_eq!(items[1].image, "A");
    }

    #[test]
    fn new_tracking_tag_copies_target_head() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream.append("latest", TagEvent::new("reg/test/is@x", "x"));

        let diff = set_spec(&mut stream, vec![istag("prod", "latest")]);
        propagator.apply_spec_diff(&mut stream, &diff, Some("prod")).unwrap();
        assert_eq!(stream.latest("prod").unwrap().image, "x");
    }

    #[test]
    fn edited_tag_failure_is_surfaced() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        let diff = set_spec(&mut stream, vec![istag("t", "missing:latest")]);
        assert!(propagator.apply_spec_diff(&mut stream, &diff, Some("t")).is_err());
    }

    #[test]
    fn other_tag_failure_is_skipped() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        let diff = set_spec(
            &mut stream,
            vec![istag("broken", "missing:latest"), docker("ok", "nginx")],
        );
        let appended = propagator.apply_spec_diff(&mut stream, &diff, Some("ok")).unwrap();
        assert_eq!(appended, vec!["ok"]);
        assert!(stream.latest("broken").is_none());
    }

    #[test]
    fn head_change_reaches_direct_trackers_only() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream.spec.tags.insert("a".into(), istag("a", "b"));
        stream.spec.tags.insert("c".into(), istag("c", "a"));
        stream.append("b", TagEvent::new("reg/test/is@b1", "b1"));

        let appended = propagator.propagate_head_change(&mut stream, "b");
        assert_eq!(appended, vec!["a"]);
        assert_eq!(stream.latest("a").unwrap().image, "b1");
        // `c` tracks `a`, which only changed during this pass.
        assert!(stream.latest("c").is_none());

        let appended = propagator.reconcile(&mut stream);
        assert_eq!(appended, vec!["c"]);
        assert_eq!(stream.latest("c").unwrap().image, "b1");
    }

    #[test]
    fn unaffected_trackers_follow_a_retargeted_tag() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream.spec.tags.insert("prod".into(), istag("prod", "is:latest"));

        let diff = set_spec(&mut stream, vec![docker("latest", "nginx:1.25")]);
        let mut appended = propagator.apply_spec_diff(&mut stream, &diff, Some("latest")).unwrap();
        appended.sort();
        assert_eq!(appended, vec!["latest", "prod"]);
        assert_eq!(stream.latest("prod").unwrap().docker_image_reference, "nginx:1.25");
    }

    #[test]
    fn cross_namespace_trackers_are_not_followed() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream
            .spec
            .tags
            .insert("a".into(), istag("a", "other/is:b"));
        stream.append("b", TagEvent::new("r", "b1"));
        assert!(propagator.propagate_head_change(&mut stream, "b").is_empty());
    }

    #[test]
    fn self_tracking_cycle_terminates() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream.spec.tags.insert("a".into(), istag("a", "b"));
        stream.spec.tags.insert("b".into(), istag("b", "a"));
        stream.append("a", TagEvent::new("r", "x"));

        let appended = propagator.propagate_head_change(&mut stream, "a");
        assert_eq!(appended, vec!["b"]);
        assert!(propagator.reconcile(&mut stream).is_empty());
    }

    #[test]
    fn reconcile_leaves_mapped_heads_alone() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        let mut latest = docker("latest", "nginx:1");
        latest.generation = Some(1);
        stream.spec.tags.insert("latest".into(), latest);
        stream.append("latest", TagEvent::new("nginx:1", "").with_generation(1));
        stream.append("latest", TagEvent::new("r/test/is@sha256:aa", "sha256:aa").with_generation(2));

        assert!(propagator.reconcile(&mut stream).is_empty());
        assert_eq!(stream.latest("latest").unwrap().image, "sha256:aa");
    }

    #[test]
    fn reconcile_retries_unresolved_retarget() {
        let store = InMemoryStreamStore::new();
        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        let mut web = docker("web", "nginx:2");
        web.generation = Some(3);
        stream.spec.tags.insert("web".into(), web);
        stream.append("web", TagEvent::new("nginx:1", "").with_generation(1));
        stream.metadata.generation = 3;

        assert_eq!(propagator.reconcile(&mut stream), vec!["web"]);
        assert_eq!(stream.latest("web").unwrap().docker_image_reference, "nginx:2");
    }

    #[test]
    fn reconcile_reads_cross_namespace_snapshot() {
        let store = InMemoryStreamStore::new();
        let mut base = ImageStream::new("shared", "base");
        base.append("stable", TagEvent::new("reg/shared/base@s1", "s1"));
        store.create_stream(&base).unwrap();

        let propagator = Propagator::new(Resolver::new(&store));
        let mut stream = ImageStream::new("test", "is");
        stream
            .spec
            .tags
            .insert("base".into(), istag("base", "shared/base:stable"));
        assert_eq!(propagator.reconcile(&mut stream), vec!["base"]);
        assert!(propagator.reconcile(&mut stream).is_empty());
    }
}
