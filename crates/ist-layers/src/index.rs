use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use ist_types::{Image, LayerEntry};

use crate::error::{LayerError, Result};

/// Read access to the layer index cache.
pub trait LayerIndex: Send + Sync {
    /// The row for an image digest, if the cache holds one.
    fn get_by_key(&self, digest: &str) -> Result<Option<LayerEntry>>;

    /// Whether the cache has completed its initial fill.
    fn has_synced(&self) -> bool;
}

/// In-memory layer index.
///
/// Starts unsynced; the owner calls [`mark_synced`](Self::mark_synced) once
/// its initial fill is complete.
pub struct InMemoryLayerIndex {
    rows: RwLock<HashMap<String, LayerEntry>>,
    synced: AtomicBool,
}

impl InMemoryLayerIndex {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            synced: AtomicBool::new(false),
        }
    }

    /// A synced index holding `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = LayerEntry>) -> Self {
        let index = Self::new();
        if let Ok(mut rows) = index.rows.write() {
            rows.extend(entries.into_iter().map(|e| (e.image.clone(), e)));
        }
        index.mark_synced();
        index
    }

    /// Insert or replace the row derived from `image`.
    pub fn upsert_image(&self, image: &Image) -> Result<()> {
        self.insert(LayerEntry::from_image(image))
    }

    pub fn insert(&self, entry: LayerEntry) -> Result<()> {
        let mut rows = self.rows.write().map_err(|_| LayerError::LockPoisoned)?;
        rows.insert(entry.image.clone(), entry);
        Ok(())
    }

    /// Remove the row for `digest`. Returns `true` if it was present.
    pub fn remove(&self, digest: &str) -> Result<bool> {
        let mut rows = self.rows.write().map_err(|_| LayerError::LockPoisoned)?;
        Ok(rows.remove(digest).is_some())
    }

    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.rows.read().map_err(|_| LayerError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All rows, sorted by digest.
    pub fn entries(&self) -> Result<Vec<LayerEntry>> {
        let rows = self.rows.read().map_err(|_| LayerError::LockPoisoned)?;
        let mut entries: Vec<LayerEntry> = rows.values().cloned().collect();
        entries.sort_by(|a, b| a.image.cmp(&b.image));
        Ok(entries)
    }
}

impl Default for InMemoryLayerIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerIndex for InMemoryLayerIndex {
    fn get_by_key(&self, digest: &str) -> Result<Option<LayerEntry>> {
        let rows = self.rows.read().map_err(|_| LayerError::LockPoisoned)?;
        Ok(rows.get(digest).cloned())
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ist_types::LayerDescriptor;

    #[test]
    fn starts_unsynced_and_empty() {
        let index = InMemoryLayerIndex::new();
        assert!(!index.has_synced());
        assert!(index.is_empty().unwrap());
        assert!(index.get_by_key("sha256:aa").unwrap().is_none());
    }

    #[test]
    fn upsert_derives_row_from_image() {
        let index = InMemoryLayerIndex::new();
        let image = Image::new("sha256:aa")
            .with_layers(vec![LayerDescriptor::new("sha256:l1", 10, "gzip")]);
        index.upsert_image(&image).unwrap();
        let row = index.get_by_key("sha256:aa").unwrap().unwrap();
        assert_eq!(row.layers.len(), 1);
        assert_eq!(row.layers[0].name, "sha256:l1");

        assert!(index.remove("sha256:aa").unwrap());
        assert!(!index.remove("sha256:aa").unwrap());
    }

    #[test]
    fn seeded_index_is_synced() {
        let index = InMemoryLayerIndex::with_entries(vec![
            LayerEntry::from_image(&Image::new("sha256:bb")),
            LayerEntry::from_image(&Image::new("sha256:aa")),
        ]);
        assert!(index.has_synced());
        let digests: Vec<String> = index.entries().unwrap().into_iter().map(|e| e.image).collect();
        assert_eq!(digests, vec!["sha256:aa", "sha256:bb"]);
    }
}
