//! SHA-256 hashing utilities.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of the input data.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute SHA-256 hash of two 32-byte nodes laid side by side.
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Compute the Merkle root of a list of 32-byte leaves.
///
/// - Empty list returns 32 zero bytes
/// - Single leaf returns that leaf
/// - Odd levels duplicate their last node
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [single] => hash_pair(single, single),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
    }

    level[0]
}

/// Commitment to an ordered list of opaque transaction payloads.
pub fn body_root(payloads: &[Vec<u8>]) -> [u8; 32] {
    let leaves: Vec<[u8; 32]> = payloads.iter().map(|p| sha256(p)).collect();
    merkle_root(&leaves)
}
