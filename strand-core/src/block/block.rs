//! Block structure containing a header and its body.

use serde::{Deserialize, Serialize};

use crate::block::{BlockHeader, BlockKind, HeaderHash};
use crate::crypto::body_root;

/// A block: header plus an ordered list of opaque transaction payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,

    /// Transaction payloads, in block order. Empty for boundary blocks.
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    /// Build a main block on top of `parent`, committing to `transactions`.
    pub fn main_child(
        parent: &BlockHeader,
        slot: u64,
        timestamp: u64,
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        let header = BlockHeader {
            kind: BlockKind::Main,
            epoch: parent.epoch,
            slot,
            height: parent.height + 1,
            prev_hash: parent.hash(),
            body_root: body_root(&transactions),
            timestamp,
        };
        Self {
            header,
            transactions,
        }
    }

    /// Build the boundary block opening `epoch` on top of `parent`.
    pub fn boundary_child(parent: &BlockHeader, epoch: u64, timestamp: u64) -> Self {
        let header = BlockHeader {
            kind: BlockKind::Boundary,
            epoch,
            slot: 0,
            height: parent.height + 1,
            prev_hash: parent.hash(),
            body_root: body_root(&[]),
            timestamp,
        };
        Self {
            header,
            transactions: Vec::new(),
        }
    }

    /// Get the block hash (delegates to header).
    #[inline]
    pub fn hash(&self) -> HeaderHash {
        self.header.hash()
    }

    /// Get the parent hash.
    #[inline]
    pub fn prev_hash(&self) -> HeaderHash {
        self.header.prev_hash
    }

    /// Get the block height.
    #[inline]
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Check whether the header commits to this body.
    pub fn verify_body_root(&self) -> bool {
        self.header.body_root == body_root(&self.transactions)
    }
}
