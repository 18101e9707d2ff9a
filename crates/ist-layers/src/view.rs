use std::collections::{BTreeSet, HashSet};
use std::thread;
use std::time::Duration;

use ist_types::{ImageBlobReferences, ImageStream, ImageStreamLayers, LayerData, LayerEntry};
use tracing::{debug, warn};

use crate::error::{LayerError, Result};
use crate::index::LayerIndex;

/// Wait between a pass that missed rows and the single retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Builds the blob view of a stream from the layer index.
pub struct ViewAssembler<'a, I: LayerIndex + ?Sized> {
    index: &'a I,
    retry_delay: Duration,
}

impl<'a, I: LayerIndex + ?Sized> ViewAssembler<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Assemble the view of every image in `stream`'s tag histories.
    ///
    /// Fails with `NotSynced` before the index's initial fill. Images still
    /// absent after the retry are flagged `imageMissing`.
    pub fn assemble(&self, stream: &ImageStream) -> Result<ImageStreamLayers> {
        if !self.index.has_synced() {
            return Err(LayerError::NotSynced);
        }

        let digests = history_images(stream);
        let (view, missing) = self.pass(&digests)?;
        if missing.is_empty() {
            return Ok(view);
        }

        debug!(
            stream = %stream.key(),
            missing = missing.len(),
            delay_ms = self.retry_delay.as_millis() as u64,
            "layer index is missing images; rebuilding once"
        );
        thread::sleep(self.retry_delay);

        let (view, missing) = self.pass(&digests)?;
        for digest in &missing {
            warn!(stream = %stream.key(), image = %digest, "image missing from layer index");
        }
        Ok(view)
    }

    /// One full walk. Returns the view and the digests the index lacked.
    fn pass(&self, roots: &BTreeSet<String>) -> Result<(ImageStreamLayers, Vec<String>)> {
        let mut view = ImageStreamLayers::new();
        let mut missing = Vec::new();
        let mut visited = HashSet::new();
        let mut pending: Vec<String> = roots.iter().rev().cloned().collect();

        while let Some(digest) = pending.pop() {
            if !visited.insert(digest.clone()) {
                continue;
            }
            match self.index.get_by_key(&digest)? {
                Some(entry) => {
                    pending.extend(entry.manifests.iter().rev().cloned());
                    add_entry(&mut view, entry);
                }
                None => {
                    view.images.insert(digest.clone(), ImageBlobReferences::missing());
                    missing.push(digest);
                }
            }
        }
        Ok((view, missing))
    }
}

/// Every non-empty image named anywhere in the stream's histories.
fn history_images(stream: &ImageStream) -> BTreeSet<String> {
    stream
        .status
        .tags
        .values()
        .flat_map(|history| history.iter())
        .filter(|event| !event.image.is_empty())
        .map(|event| event.image.clone())
        .collect()
}

fn add_entry(view: &mut ImageStreamLayers, entry: LayerEntry) {
    for layer in &entry.layers {
        view.blobs.entry(layer.name.clone()).or_insert_with(|| LayerData {
            size: layer.size,
            media_type: layer.media_type.clone(),
        });
    }
    if let Some(config) = &entry.config {
        view.blobs.entry(config.name.clone()).or_insert_with(|| LayerData {
            size: config.size,
            media_type: config.media_type.clone(),
        });
    }
    view.blobs.entry(entry.image.clone()).or_insert_with(|| LayerData {
        size: entry.manifest_size,
        media_type: entry.media_type.clone(),
    });

    let refs = ImageBlobReferences {
        layers: entry.layers.iter().map(|l| l.name.clone()).collect(),
        config: entry.config.as_ref().map(|c| c.name.clone()),
        manifests: entry.manifests,
        image_missing: false,
    };
    view.images.insert(entry.image, refs);
}
