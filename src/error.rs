//! Error types for the synchronization layer.

use thiserror::Error;

/// Main error type for sync operations.
///
/// Only API call sites return these. Anomalies on the message path
/// (undecodable frames, duplicates, unknown ids) are logged instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No stream bound for {entity_type}/{event}")]
    StreamUnbound { entity_type: String, event: String },

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Registry has been disconnected")]
    Disconnected,

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for SyncError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        SyncError::Encode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for SyncError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
