//! The JSON state file the CLI persists the in-memory stores to.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ist_layers::InMemoryLayerIndex;
use ist_sdk::{Engine, EngineConfig};
use ist_store::{InMemoryImageStore, InMemoryStreamStore, StoreSnapshot};
use ist_types::LayerEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(flatten)]
    stores: StoreSnapshot,
    #[serde(default)]
    layers: Vec<LayerEntry>,
}

/// Stores loaded from a state file.
pub struct Workspace {
    path: PathBuf,
    pub streams: Arc<InMemoryStreamStore>,
    pub images: Arc<InMemoryImageStore>,
    pub layers: Arc<InMemoryLayerIndex>,
}

impl Workspace {
    /// Load `path`, or start empty if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let state = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading state file {}", path.display()))?;
            serde_json::from_str::<StateFile>(&text)
                .with_context(|| format!("parsing state file {}", path.display()))?
        } else {
            debug!(path = %path.display(), "no state file; starting empty");
            StateFile::default()
        };

        let (streams, images) = state.stores.restore();
        Ok(Self {
            path: path.to_path_buf(),
            streams: Arc::new(streams),
            images: Arc::new(images),
            layers: Arc::new(InMemoryLayerIndex::with_entries(state.layers)),
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let state = StateFile {
            stores: StoreSnapshot::capture(&self.streams, &self.images)?,
            layers: self.layers.entries()?,
        };
        let text = serde_json::to_string_pretty(&state)?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing state file {}", self.path.display()))?;
        debug!(path = %self.path.display(), streams = state.stores.streams.len(), "saved state");
        Ok(())
    }

    pub fn engine(&self, config: EngineConfig) -> Engine {
        Engine::new(
            self.streams.clone(),
            self.images.clone(),
            self.layers.clone(),
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ist_layers::LayerIndex;
    use ist_store::{ImageStore, StreamStore};
    use ist_types::{Image, ImageStream};

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::load(&dir.path().join("state.json")).unwrap();
        assert!(ws.streams.is_empty().unwrap());
        assert!(ws.layers.has_synced());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let ws = Workspace::load(&path).unwrap();
        ws.streams.create_stream(&ImageStream::new("test", "is")).unwrap();
        let image = Image::new("sha256:aa");
        ws.images.create_image(&image).unwrap();
        ws.layers.upsert_image(&image).unwrap();
        ws.save().unwrap();

        let reloaded = Workspace::load(&path).unwrap();
        let stream = reloaded.streams.get_stream("test", "is").unwrap().unwrap();
        assert_eq!(stream.metadata.resource_version, "1");
        assert!(reloaded.images.get_image("sha256:aa").unwrap().is_some());
        assert!(reloaded.layers.get_by_key("sha256:aa").unwrap().is_some());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ nope").unwrap();
        let err = Workspace::load(&path).err().unwrap();
        assert!(err.to_string().contains("parsing state file"));
    }
}
