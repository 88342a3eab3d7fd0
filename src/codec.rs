//! Wire payload encoding.

use crate::error::{Result, SyncError};
use crate::types::WireFormat;
use serde_json::Value;

/// Decode a raw frame into a JSON value.
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<Value> {
    match format {
        WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
        WireFormat::MessagePack => Ok(rmp_serde::from_slice(bytes)?),
    }
}

/// Encode a JSON value as a frame.
pub fn encode(value: &Value, format: WireFormat) -> Result<Vec<u8>> {
    match format {
        WireFormat::Json => {
            serde_json::to_vec(value).map_err(|e| SyncError::Encode(e.to_string()))
        }
        // Named encoding keeps object keys, which records depend on.
        WireFormat::MessagePack => Ok(rmp_serde::to_vec_named(value)?),
    }
}
