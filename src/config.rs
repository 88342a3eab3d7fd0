//! Sync layer configuration.

use crate::error::{Result, SyncError};
use crate::types::WireFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration shared by the registry, binder and facade.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Appended to the entity type to form its topic name.
    /// Default: "-channel"
    pub topic_suffix: String,

    /// Encoding of frames delivered by the transport.
    /// Default: JSON
    pub wire_format: WireFormat,

    /// Unwrap a sub-field named after the entity type when present.
    /// Default: true
    pub unwrap_entity: bool,

    /// Emit created/updated/deleted notifications.
    /// Default: true
    pub notify: bool,

    /// How long a notification stays visible (None = sink default).
    /// Default: 3000ms
    pub notification_duration_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            topic_suffix: "-channel".to_string(),
            wire_format: WireFormat::Json,
            unwrap_entity: true,
            notify: true,
            notification_duration_ms: Some(3000),
        }
    }
}

impl SyncConfig {
    /// Parse a (possibly partial) JSON config.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: SyncConfig =
            serde_json::from_str(s).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        if self.topic_suffix.chars().any(char::is_whitespace) {
            return Err(SyncError::Config(format!(
                "topic_suffix must not contain whitespace: {:?}",
                self.topic_suffix
            )));
        }
        Ok(())
    }

    /// Topic name for an entity type.
    pub fn topic_name(&self, entity_type: &str) -> String {
        format!("{}{}", entity_type, self.topic_suffix)
    }

    pub fn notification_duration(&self) -> Option<Duration> {
        self.notification_duration_ms.map(Duration::from_millis)
    }
}
