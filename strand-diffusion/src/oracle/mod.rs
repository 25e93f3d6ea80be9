//! The chain oracle: the narrow view of chain state the diffusion layer uses.
//!
//! Methods are synchronous so no lock is ever held across a conversation
//! suspension point. Implementations own validation and fork choice; this
//! layer only reads, except for [`ChainOracle::post_block_header`].

mod memory;

pub use memory::MemoryChain;

use strand_core::{Block, BlockHeader, HeaderHash, NewestFirst, OldestFirst};
use thiserror::Error;

use crate::config::SecurityParams;
use crate::peer::PeerId;

/// A plain lookup against the chain store failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain lookup failed: {0}")]
pub struct OracleError(pub String);

/// The tip could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetTipError {
    /// The chain has no blocks yet.
    #[error("chain has no tip")]
    Empty,

    /// The tip hash points at a block the store does not have.
    #[error("tip block {0} is missing")]
    Missing(HeaderHash),

    /// Lookup failure.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// A checkpoint-bounded header range could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetBlockHeadersError {
    /// The range end is not known locally.
    #[error("unknown header {0}")]
    UnknownHeader(HeaderHash),

    /// Walking back from the range end reached the first block without
    /// meeting any checkpoint.
    #[error("none of {0} checkpoints is an ancestor of the requested header")]
    NoCheckpoint(usize),

    /// The newest checkpoint is the range end itself.
    #[error("no headers after the newest checkpoint")]
    Empty,

    /// The tip was needed and is unavailable.
    #[error(transparent)]
    Tip(#[from] GetTipError),

    /// Lookup failure.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Chain state as seen by the diffusion protocol.
pub trait ChainOracle: Send + Sync {
    /// The newest block considered canonical.
    fn tip(&self) -> Result<Block, GetTipError>;

    /// Header for `hash`, if known.
    fn block_header(&self, hash: &HeaderHash) -> Result<Option<BlockHeader>, OracleError>;

    /// Headers strictly newer than the newest checkpoint found on the chain
    /// ending at `to` (the tip when `None`), newest first.
    fn block_headers(
        &self,
        checkpoints: &[HeaderHash],
        to: Option<HeaderHash>,
    ) -> Result<NewestFirst<BlockHeader>, GetBlockHeadersError>;

    /// Hashes of the closed range `from..=to`, oldest first. `None` when the
    /// range is unknown, disconnected or longer than `limit`.
    fn header_hashes_between(
        &self,
        from: &HeaderHash,
        to: &HeaderHash,
        limit: usize,
    ) -> Result<Option<OldestFirst<HeaderHash>>, OracleError>;

    /// Block for `hash`, if known.
    fn block(&self, hash: &HeaderHash) -> Result<Option<Block>, OracleError>;

    /// Blocks behind [`ChainOracle::block_headers`], oldest first.
    fn blocks(
        &self,
        checkpoints: &[HeaderHash],
        to: Option<HeaderHash>,
    ) -> Result<OldestFirst<Block>, GetBlockHeadersError>;

    /// Hand an unsolicited header from `peer` to the chain logic.
    fn post_block_header(&self, header: BlockHeader, peer: PeerId);

    /// Whether the local node is still catching up.
    fn recovery_in_progress(&self) -> bool;

    /// Attack-simulation policy.
    fn security_params(&self) -> SecurityParams;
}
