//! Deterministic binary serialization.
//!
//! Header hashes are computed over serialized bytes, so every node must
//! produce identical output for identical input. Bincode is configured with
//! fixed-size little-endian integers and rejects trailing bytes.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::SerializationError;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Serialize a value to bytes.
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    options()
        .serialize(value)
        .map_err(|e| SerializationError::EncodeFailed(e.to_string()))
}

/// Deserialize a value from bytes, rejecting malformed input and trailing bytes.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    options()
        .deserialize(bytes)
        .map_err(|e| SerializationError::DecodeFailed(e.to_string()))
}

/// Encoded size of a value, without allocating the encoding.
///
/// Transports use this to enforce per-message receive limits.
pub fn serialized_size<T: Serialize>(value: &T) -> Result<u64, SerializationError> {
    options()
        .serialized_size(value)
        .map_err(|e| SerializationError::EncodeFailed(e.to_string()))
}
