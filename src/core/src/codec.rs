//! Stable binary encoding for persisted records
//!
//! Records are written as MessagePack maps keyed by field name, so every
//! stored value carries its own schema and decoding then re-encoding an
//! unchanged record yields the same bytes. Decode failures are reported as
//! `CoreError::Codec` and must never be treated as a missing record.

use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a record
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| CoreError::codec(format!("encode failed: {}", e)))
}

/// Decode a record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(|e| CoreError::codec(format!("decode failed: {}", e)))
}
