//! # Strand Core
//!
//! Core chain types, hashing, and serialization for the Strand protocol.
//!
//! This crate provides the foundation for the other Strand crates:
//! - Content hashes identifying headers and blocks
//! - Block headers (main and epoch-boundary) and block bodies
//! - Direction-tagged, non-empty sequences (`NewestFirst`, `OldestFirst`)
//! - SHA-256 hashing and Merkle roots
//! - Deterministic binary serialization

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod block;
pub mod crypto;
pub mod error;
pub mod ordering;
pub mod serialization;

// Re-export commonly used types at crate root
pub use block::{Block, BlockHeader, BlockKind, HeaderHash};
pub use error::{CoreError, OrderingError, SerializationError};
pub use ordering::{NewestFirst, OldestFirst};
