//! Cryptographic primitives for the Strand protocol.
//!
//! Only hashing lives here: header hashes are SHA-256 of the serialized
//! header, and block bodies are committed to with a binary Merkle tree.

mod hashing;

pub use hashing::{body_root, merkle_root, sha256};
