//! Tag-reference diff: compare two `spec.tags` maps.

use std::collections::BTreeMap;

use ist_types::{FromKind, TagReference};
use serde::Serialize;

/// The normalized source of a tag reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EffectiveReference {
    pub kind: FromKind,
    pub namespace: String,
    pub name: String,
}

impl EffectiveReference {
    /// The effective source of `tag` within a stream in `owner_namespace`.
    ///
    /// Returns `None` for a tag reference with no (or an empty) `from`.
    pub fn of(tag: &TagReference, owner_namespace: &str) -> Option<Self> {
        let from = tag.from.as_ref()?;
        if from.name.is_empty() {
            return None;
        }
        Some(Self {
            kind: from.kind,
            namespace: from.effective_namespace(owner_namespace).to_string(),
            name: from.name.clone(),
        })
    }
}

/// Returns `true` if `new` names a source that differs from `old`'s.
///
/// A `new` without a source is never a change: an empty `from` is a no-op
/// entry with nothing to resolve.
pub fn tag_ref_changed(old: Option<&TagReference>, new: &TagReference, owner_namespace: &str) -> bool {
    let Some(new_ref) = EffectiveReference::of(new, owner_namespace) else {
        return false;
    };
    match old {
        None => true,
        Some(old) => EffectiveReference::of(old, owner_namespace).as_ref() != Some(&new_ref),
    }
}

/// A single change in a tag reference map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagRefChange {
    /// A tag reference was added.
    Added { tag: String },
    /// A tag reference was removed.
    Removed { tag: String },
    /// The effective source changed.
    Retargeted { tag: String },
    /// Only non-source fields changed (policies, annotations), or the
    /// source was cleared.
    Amended { tag: String },
}

impl TagRefChange {
    pub fn tag(&self) -> &str {
        match self {
            TagRefChange::Added { tag }
            | TagRefChange::Removed { tag }
            | TagRefChange::Retargeted { tag }
            | TagRefChange::Amended { tag } => tag,
        }
    }

    /// Returns `true` if the change requires resolving the tag's source.
    pub fn needs_resolution(&self) -> bool {
        matches!(self, TagRefChange::Added { .. } | TagRefChange::Retargeted { .. })
    }
}

/// The result of comparing two tag reference maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecDiff {
    pub changes: Vec<TagRefChange>,
}

impl SpecDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Tags whose source must be (re)resolved.
    pub fn tags_to_resolve(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(|c| c.needs_resolution())
            .map(TagRefChange::tag)
    }

    /// Returns `true` if any change affects a tag's effective source.
    pub fn is_effective(&self) -> bool {
        self.changes
            .iter()
            .any(|c| !matches!(c, TagRefChange::Amended { .. }))
    }

    /// Returns `true` if `tag` appears in this diff.
    pub fn touches(&self, tag: &str) -> bool {
        self.changes.iter().any(|c| c.tag() == tag)
    }
}

/// Compute the diff between two tag reference maps.
///
/// The `generation` field is ignored: it is stamped by the engine, not edited
/// by callers.
pub fn diff_tag_references(
    old: &BTreeMap<String, TagReference>,
    new: &BTreeMap<String, TagReference>,
    owner_namespace: &str,
) -> SpecDiff {
    let mut changes = Vec::new();

    for (tag, old_ref) in old {
        match new.get(tag) {
            Some(new_ref) => {
                if tag_ref_changed(Some(old_ref), new_ref, owner_namespace) {
                    changes.push(TagRefChange::Retargeted { tag: tag.clone() });
                } else if !same_ignoring_generation(old_ref, new_ref) {
                    changes.push(TagRefChange::Amended { tag: tag.clone() });
                }
            }
            None => changes.push(TagRefChange::Removed { tag: tag.clone() }),
        }
    }

    for tag in new.keys() {
        if !old.contains_key(tag) {
            changes.push(TagRefChange::Added { tag: tag.clone() });
        }
    }

    SpecDiff { changes }
}

fn same_ignoring_generation(a: &TagReference, b: &TagReference) -> bool {
    has_source(a) == has_source(b)
        && a.name == b.name
        && a.import_policy == b.import_policy
        && a.reference_policy == b.reference_policy
        && a.annotations == b.annotations
}

fn has_source(tag: &TagReference) -> bool {
    tag.from.as_ref().is_some_and(|from| !from.name.is_empty())
}
