use std::path::Path;
use std::time::Duration;

use ist_mutation::{ConflictClassifier, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Engine tuning, loaded from TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Write attempts per mutation before giving up.
    pub max_attempts: u32,
    /// Wait before the single layer view rebuild.
    pub layer_retry_delay_ms: u64,
    /// Internal registry hostname; streams fall back to their upstream repository without one.
    pub registry_hostname: Option<String>,
    /// Whether tag writes and mappings create a missing stream.
    pub create_stream_on_missing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            layer_retry_delay_ms: 250,
            registry_hostname: None,
            create_stream_on_missing: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        if config.max_attempts == 0 {
            return Err(SdkError::Config("max_attempts must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn layer_retry_delay(&self) -> Duration {
        Duration::from_millis(self.layer_retry_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, ConflictClassifier::TagHistory)
    }
}
