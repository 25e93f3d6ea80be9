//! Error types for the Strand core crate.

use std::fmt;

/// Top-level error type for strand-core operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Serialization or deserialization failed.
    Serialization(SerializationError),
    /// A direction-tagged sequence could not be built.
    Ordering(OrderingError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Serialization(e) => write!(f, "serialization error: {}", e),
            CoreError::Ordering(e) => write!(f, "ordering error: {}", e),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<SerializationError> for CoreError {
    fn from(e: SerializationError) -> Self {
        CoreError::Serialization(e)
    }
}

impl From<OrderingError> for CoreError {
    fn from(e: OrderingError) -> Self {
        CoreError::Ordering(e)
    }
}

/// Errors related to serialization and deserialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to encode data to bytes.
    EncodeFailed(String),
    /// Failed to decode data from bytes.
    DecodeFailed(String),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::EncodeFailed(msg) => write!(f, "encode failed: {}", msg),
            SerializationError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

impl std::error::Error for SerializationError {}

/// Errors building `NewestFirst` / `OldestFirst` sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderingError {
    /// The sequence would have no elements.
    Empty,
}

impl fmt::Display for OrderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingError::Empty => write!(f, "sequence must not be empty"),
        }
    }
}

impl std::error::Error for OrderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CoreError::Serialization(SerializationError::EncodeFailed("test".into()));
        assert!(e.to_string().contains("encode failed"));

        let e = CoreError::Ordering(OrderingError::Empty);
        assert!(e.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_error_conversion() {
        let core_err: CoreError = OrderingError::Empty.into();
        assert!(matches!(core_err, CoreError::Ordering(OrderingError::Empty)));
    }
}
