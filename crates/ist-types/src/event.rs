use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One resolved binding of a tag to an image.
///
/// Events are immutable once appended to a [`TagEventList`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    /// Pull spec for the image.
    pub docker_image_reference: String,
    /// Image name (digest), or empty when only the pull spec is known.
    #[serde(default)]
    pub image: String,
    /// Stream generation at which this event was appended.
    #[serde(default)]
    pub generation: u64,
    pub created: DateTime<Utc>,
}

impl TagEvent {
    pub fn new(docker_image_reference: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            docker_image_reference: docker_image_reference.into(),
            image: image.into(),
            generation: 0,
            created: Utc::now(),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Returns `true` if both events bind the same image and pull spec.
    ///
    /// Generation and creation time are deliberately ignored: this is the
    /// no-op test used when appending.
    pub fn same_binding(&self, other: &TagEvent) -> bool {
        self.image == other.image && self.docker_image_reference == other.docker_image_reference
    }
}

/// Newest-first, append-only history of a tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEventList {
    items: Vec<TagEvent>,
}

impl TagEventList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from events ordered newest first.
    pub fn from_newest_first(items: Vec<TagEvent>) -> Self {
        Self { items }
    }

    /// The newest event.
    pub fn latest(&self) -> Option<&TagEvent> {
        self.items.first()
    }

    pub fn items(&self) -> &[TagEvent] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEvent> {
        self.items.iter()
    }

    /// Unconditionally place `event` at the head.
    ///
    /// No-op detection belongs to the tag event log; prefer its `append`.
    pub fn prepend(&mut self, event: TagEvent) {
        self.items.insert(0, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_puts_newest_first() {
        let mut list = TagEventList::new();
        list.prepend(TagEvent::new("repo@sha256:aa", "sha256:aa"));
        list.prepend(TagEvent::new("repo@sha256:bb", "sha256:bb"));
        assert_eq!(list.len(), 2);
        assert_eq!(list.latest().unwrap().image, "sha256:bb");
        assert_eq!(list.items()[1].image, "sha256:aa");
    }

    #[test]
    fn same_binding_ignores_generation_and_time() {
        let a = TagEvent::new("ref", "img").with_generation(1);
        let b = TagEvent::new("ref", "img").with_generation(7);
        assert!(a.same_binding(&b));
        assert!(!a.same_binding(&TagEvent::new("other", "img")));
        assert!(!a.same_binding(&TagEvent::new("ref", "")));
    }

    #[test]
    fn serde_uses_items_key() {
        let list = TagEventList::from_newest_first(vec![TagEvent::new("ref", "img")]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["items"][0]["dockerImageReference"], "ref");
        assert_eq!(json["items"][0]["image"], "img");
    }
}
