use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use ist_types::{Image, ImageStream};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ImageStore, StreamStore};

struct StreamTable {
    streams: HashMap<(String, String), ImageStream>,
    last_version: u64,
}

impl StreamTable {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }
}

/// In-memory, HashMap-based stream store with compare-and-swap updates.
///
/// resourceVersions are decimal strings drawn from a single counter, so every
/// write in the store receives a distinct version.
pub struct InMemoryStreamStore {
    table: RwLock<StreamTable>,
}

impl InMemoryStreamStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(StreamTable {
                streams: HashMap::new(),
                last_version: 0,
            }),
        }
    }

    /// Seed a store with previously persisted streams.
    ///
    /// Existing resourceVersions are kept; streams without one are assigned a
    /// fresh version. The version counter resumes above the highest numeric
    /// version seen.
    pub fn with_streams(streams: impl IntoIterator<Item = ImageStream>) -> Self {
        let mut table = StreamTable {
            streams: HashMap::new(),
            last_version: 0,
        };
        let streams: Vec<ImageStream> = streams.into_iter().collect();
        table.last_version = streams
            .iter()
            .filter_map(|s| s.metadata.resource_version.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        for mut stream in streams {
            if stream.metadata.resource_version.is_empty() {
                stream.metadata.resource_version = table.next_version();
            }
            let key = (stream.metadata.namespace.clone(), stream.metadata.name.clone());
            table.streams.insert(key, stream);
        }
        Self {
            table: RwLock::new(table),
        }
    }

    /// Number of streams currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.streams.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.streams.is_empty())
    }

    /// All streams, sorted by namespace then name.
    pub fn all_streams(&self) -> StoreResult<Vec<ImageStream>> {
        let table = self.read()?;
        let mut streams: Vec<ImageStream> = table.streams.values().cloned().collect();
        streams.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(streams)
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StreamTable>> {
        self.table.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StreamTable>> {
        self.table.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryStreamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamStore for InMemoryStreamStore {
    fn get_stream(&self, namespace: &str, name: &str) -> StoreResult<Option<ImageStream>> {
        let table = self.read()?;
        Ok(table
            .streams
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    fn list_streams(&self, namespace: &str) -> StoreResult<Vec<ImageStream>> {
        let table = self.read()?;
        let mut streams: Vec<ImageStream> = table
            .streams
            .values()
            .filter(|s| s.metadata.namespace == namespace)
            .cloned()
            .collect();
        streams.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(streams)
    }

    fn create_stream(&self, stream: &ImageStream) -> StoreResult<ImageStream> {
        let mut table = self.write()?;
        let key = (stream.metadata.namespace.clone(), stream.metadata.name.clone());
        if table.streams.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: "imagestream",
                key: stream.key(),
            });
        }

        let mut stored = stream.clone();
        stored.metadata.uid = Some(Uuid::now_v7());
        stored.metadata.creation_timestamp = Some(Utc::now());
        stored.metadata.resource_version = table.next_version();

        debug!(
            stream = %stored.key(),
            resource_version = %stored.metadata.resource_version,
            "created image stream"
        );
        table.streams.insert(key, stored.clone());
        Ok(stored)
    }

    fn update_stream(&self, stream: &ImageStream) -> StoreResult<ImageStream> {
        let mut table = self.write()?;
        let key = (stream.metadata.namespace.clone(), stream.metadata.name.clone());
        let current = table.streams.get(&key).ok_or_else(|| StoreError::NotFound {
            kind: "imagestream",
            key: stream.key(),
        })?;

        if current.metadata.resource_version != stream.metadata.resource_version {
            return Err(StoreError::Conflict {
                key: stream.key(),
                expected: stream.metadata.resource_version.clone(),
                actual: current.metadata.resource_version.clone(),
            });
        }

        let mut stored = stream.clone();
        stored.metadata.uid = current.metadata.uid;
        stored.metadata.creation_timestamp = current.metadata.creation_timestamp;
        stored.metadata.resource_version = table.next_version();

        debug!(
            stream = %stored.key(),
            resource_version = %stored.metadata.resource_version,
            generation = stored.metadata.generation,
            "updated image stream"
        );
        table.streams.insert(key, stored.clone());
        Ok(stored)
    }

    fn delete_stream(&self, namespace: &str, name: &str) -> StoreResult<bool> {
        let mut table = self.write()?;
        Ok(table
            .streams
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some())
    }
}

/// In-memory, HashMap-based image store keyed by digest.
pub struct InMemoryImageStore {
    images: RwLock<HashMap<String, Image>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_images(images: impl IntoIterator<Item = Image>) -> Self {
        Self {
            images: RwLock::new(images.into_iter().map(|i| (i.name.clone(), i)).collect()),
        }
    }

    /// All images, sorted by digest.
    pub fn all_images(&self) -> StoreResult<Vec<Image>> {
        let map = self.images.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut images: Vec<Image> = map.values().cloned().collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(images)
    }
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore for InMemoryImageStore {
    fn get_image(&self, name: &str) -> StoreResult<Option<Image>> {
        let map = self.images.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(name).cloned())
    }

    fn create_image(&self, image: &Image) -> StoreResult<Image> {
        let mut map = self.images.write().map_err(|_| StoreError::LockPoisoned)?;
        if map.contains_key(&image.name) {
            return Err(StoreError::AlreadyExists {
                kind: "image",
                key: image.name.clone(),
            });
        }
        map.insert(image.name.clone(), image.clone());
        Ok(image.clone())
    }
}

/// Serializable contents of a pair of in-memory stores.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub streams: Vec<ImageStream>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl StoreSnapshot {
    /// Capture the current contents of both stores.
    pub fn capture(streams: &InMemoryStreamStore, images: &InMemoryImageStore) -> StoreResult<Self> {
        Ok(Self {
            streams: streams.all_streams()?,
            images: images.all_images()?,
        })
    }

    /// Rebuild stores from this snapshot.
    pub fn restore(self) -> (InMemoryStreamStore, InMemoryImageStore) {
        (
            InMemoryStreamStore::with_streams(self.streams),
            InMemoryImageStore::with_images(self.images),
        )
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
