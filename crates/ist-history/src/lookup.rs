use std::collections::BTreeSet;

use ist_types::digest::matches_id;
use ist_types::{ImageStream, TagEvent};

use crate::error::{HistoryError, Result};

/// Find the event whose image is addressed by `id` in any tag's history.
///
/// `id` may be a full image name, a prefix of one, or a prefix of a digest's
/// hex part. More than one distinct matching image is an error; the same
/// image appearing under several tags is not. The returned event is a fresh
/// copy carrying the matched binding.
pub fn resolve_image_id(stream: &ImageStream, id: &str) -> Result<TagEvent> {
    let mut found: Option<&TagEvent> = None;
    let mut images = BTreeSet::new();

    for history in stream.status.tags.values() {
        for event in history.iter() {
            if matches_id(&event.image, id) {
                images.insert(event.image.clone());
                found.get_or_insert(event);
            }
        }
    }

    match (images.len(), found) {
        (1, Some(event)) => Ok(TagEvent::new(
            event.docker_image_reference.clone(),
            event.image.clone(),
        )),
        (0, _) | (_, None) => Err(HistoryError::ImageNotFound {
            stream: stream.key(),
            id: id.to_string(),
        }),
        _ => Err(HistoryError::AmbiguousImage {
            stream: stream.key(),
            id: id.to_string(),
            matches: images.into_iter().collect(),
        }),
    }
}
