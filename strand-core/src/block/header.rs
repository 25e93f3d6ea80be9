//! Block header structure and header hashes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::sha256;
use crate::serialization::serialize;

/// Content hash identifying a header (and the block it heads).
///
/// Hashes carry no ordering of their own: chain position is only known by
/// following `prev_hash` links.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HeaderHash(pub [u8; 32]);

impl HeaderHash {
    /// The all-zero hash used as the parent of the first block.
    pub const ZERO: HeaderHash = HeaderHash([0u8; 32]);

    /// Abbreviated hex form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for HeaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for HeaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeaderHash({})", self.short())
    }
}

/// Whether a block carries transactions or only marks an epoch boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Regular block carrying transaction payloads.
    Main,
    /// Epoch-boundary block with an empty body.
    Boundary,
}

/// Block header containing chain position and a commitment to the body.
///
/// The hash is computed from the serialized header, so the body is only
/// covered through `body_root`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Main or boundary block.
    pub kind: BlockKind,

    /// Epoch index.
    pub epoch: u64,

    /// Slot within the epoch. Boundary blocks use slot 0.
    pub slot: u64,

    /// Distance from the first block (0 for the first block).
    pub height: u64,

    /// Hash of the parent header. `HeaderHash::ZERO` for the first block.
    pub prev_hash: HeaderHash,

    /// Merkle root of the body's transaction payloads.
    pub body_root: [u8; 32],

    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

impl BlockHeader {
    /// Compute the header hash: SHA-256 of the bincode-serialized header.
    pub fn hash(&self) -> HeaderHash {
        let bytes = serialize(self).expect("BlockHeader serialization should not fail");
        HeaderHash(sha256(&bytes))
    }

    /// Check whether this header belongs to a main block.
    #[inline]
    pub fn is_main(&self) -> bool {
        self.kind == BlockKind::Main
    }

    /// Check whether this header has no parent.
    #[inline]
    pub fn is_first(&self) -> bool {
        self.height == 0 && self.prev_hash == HeaderHash::ZERO
    }
}
