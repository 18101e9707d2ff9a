use ist_types::{ImageStream, TagEvent, TagEventList};
use tracing::debug;

use crate::error::{HistoryError, Result};

/// Append/read/delete boundary over a stream's per-tag histories.
pub trait TagEventLog {
    /// Prepend `event` to the history of `tag` unless it binds the same image
    /// and pull spec as the current head. Returns `true` if the history grew.
    fn append(&mut self, tag: &str, event: TagEvent) -> bool;

    /// The head event of `tag`.
    fn latest(&self, tag: &str) -> Option<&TagEvent>;

    /// Remove `tag` from both spec and status.
    ///
    /// Fails with `TagNotFound` only if the tag existed in neither.
    fn delete(&mut self, tag: &str) -> Result<()>;
}

impl TagEventLog for ImageStream {
    fn append(&mut self, tag: &str, event: TagEvent) -> bool {
        if let Some(head) = self.latest(tag) {
            if head.same_binding(&event) {
                return false;
            }
        }
        debug!(
            stream = %self.key(),
            tag,
            image = %event.image,
            reference = %event.docker_image_reference,
            "appending tag event"
        );
        self.status
            .tags
            .entry(tag.to_string())
            .or_default()
            .prepend(event);
        true
    }

    fn latest(&self, tag: &str) -> Option<&TagEvent> {
        self.status.tags.get(tag).and_then(TagEventList::latest)
    }

    fn delete(&mut self, tag: &str) -> Result<()> {
        let in_spec = self.spec.tags.remove(tag).is_some();
        let in_status = self.status.tags.remove(tag).is_some();
        if !in_spec && !in_status {
            return Err(HistoryError::TagNotFound {
                stream: self.key(),
                tag: tag.to_string(),
            });
        }
        debug!(stream = %self.key(), tag, in_spec, in_status, "deleted tag");
        Ok(())
    }
}

/// Result of comparing two versions of a tag history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryChange {
    /// Any position differs, or the lengths differ.
    pub changed: bool,
    /// The new history has fewer items than the old one.
    pub deleted: bool,
}

/// Compare two histories position by position.
///
/// A missing history is treated as empty. Events are compared by binding
/// (image and pull spec), not by timestamp.
pub fn compare_histories(old: Option<&TagEventList>, new: Option<&TagEventList>) -> HistoryChange {
    let old_items = old.map(TagEventList::items).unwrap_or_default();
    let new_items = new.map(TagEventList::items).unwrap_or_default();

    let deleted = new_items.len() < old_items.len();
    let changed = old_items.len() != new_items.len()
        || old_items
            .iter()
            .zip(new_items)
            .any(|(a, b)| !a.same_binding(b));

    HistoryChange { changed, deleted }
}
