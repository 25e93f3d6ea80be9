//! In-memory chain oracle.
//!
//! Blocks are kept in a hash-indexed map with parent links and a tip
//! pointer. Nothing is validated beyond parent linkage. Useful for tests,
//! demos and the reference node.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strand_core::{Block, BlockHeader, BlockKind, HeaderHash, NewestFirst, OldestFirst};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ChainOracle, GetBlockHeadersError, GetTipError, OracleError};
use crate::config::{SecurityParams, DEFAULT_MAX_BLOCKS_PER_REQUEST};
use crate::peer::PeerId;

/// Timestamp of the first generated block.
const GENERATED_START_TIME: u64 = 1_700_000_000;

/// Seconds between generated blocks.
const GENERATED_SLOT_SECONDS: u64 = 20;

#[derive(Default)]
struct ChainIndex {
    blocks: HashMap<HeaderHash, Block>,
    tip: Option<HeaderHash>,
}

/// Chain oracle over an in-memory block map.
pub struct MemoryChain {
    index: RwLock<ChainIndex>,
    recovery: AtomicBool,
    security: SecurityParams,
    header_limit: usize,
    posted: Mutex<Option<mpsc::UnboundedSender<(BlockHeader, PeerId)>>>,
}

impl MemoryChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(ChainIndex::default()),
            recovery: AtomicBool::new(false),
            security: SecurityParams::default(),
            header_limit: DEFAULT_MAX_BLOCKS_PER_REQUEST,
            posted: Mutex::new(None),
        }
    }

    /// Create a chain holding `blocks`, which must be parent-linked and
    /// ordered oldest first.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, OracleError> {
        let chain = Self::new();
        for block in blocks {
            chain.apply_block(block)?;
        }
        Ok(chain)
    }

    /// Set the attack-simulation policy reported to the protocol.
    pub fn with_security(mut self, security: SecurityParams) -> Self {
        self.security = security;
        self
    }

    /// Cap the number of headers returned for one range request.
    pub fn with_header_limit(mut self, limit: usize) -> Self {
        self.header_limit = limit;
        self
    }

    /// Generate a parent-linked chain of `length` blocks, oldest first.
    ///
    /// The first block and every block at a multiple of `slots_per_epoch`
    /// are epoch-boundary blocks; the rest are main blocks carrying one
    /// payload each.
    pub fn generate(length: usize, slots_per_epoch: u64) -> Vec<Block> {
        let slots_per_epoch = slots_per_epoch.max(1);
        let mut blocks: Vec<Block> = Vec::with_capacity(length);

        for height in 0..length as u64 {
            let timestamp = GENERATED_START_TIME + height * GENERATED_SLOT_SECONDS;
            let block = match blocks.last() {
                None => Block {
                    header: BlockHeader {
                        kind: BlockKind::Boundary,
                        epoch: 0,
                        slot: 0,
                        height: 0,
                        prev_hash: HeaderHash::ZERO,
                        body_root: strand_core::crypto::body_root(&[]),
                        timestamp,
                    },
                    transactions: Vec::new(),
                },
                Some(parent) if height % slots_per_epoch == 0 => {
                    Block::boundary_child(&parent.header, height / slots_per_epoch, timestamp)
                }
                Some(parent) => Block::main_child(
                    &parent.header,
                    height % slots_per_epoch,
                    timestamp,
                    vec![format!("payload-{}", height).into_bytes()],
                ),
            };
            blocks.push(block);
        }

        blocks
    }

    /// Add a block whose parent is known (or which has no parent). The block
    /// becomes the tip when it is higher than the current tip.
    pub fn apply_block(&self, block: Block) -> Result<HeaderHash, OracleError> {
        let hash = block.hash();
        let mut index = self.write()?;

        if !block.header.is_first() && !index.blocks.contains_key(&block.prev_hash()) {
            return Err(OracleError(format!(
                "parent {} of block {} is unknown",
                block.prev_hash().short(),
                hash.short()
            )));
        }

        let becomes_tip = match index.tip.and_then(|tip| index.blocks.get(&tip)) {
            Some(tip) => block.height() > tip.height(),
            None => true,
        };
        if becomes_tip {
            index.tip = Some(hash);
        }

        debug!(hash = %hash.short(), height = block.height(), becomes_tip, "Applied block");
        index.blocks.insert(hash, block);
        Ok(hash)
    }

    /// Add blocks oldest first. Returns how many were applied.
    pub fn apply_blocks(&self, blocks: OldestFirst<Block>) -> Result<usize, OracleError> {
        let count = blocks.len();
        for block in blocks {
            self.apply_block(block)?;
        }
        Ok(count)
    }

    /// Turn recovery mode on or off.
    pub fn set_recovery(&self, in_progress: bool) {
        self.recovery.store(in_progress, Ordering::SeqCst);
    }

    /// Receive every header posted through [`ChainOracle::post_block_header`].
    /// A new subscription replaces the previous one.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<(BlockHeader, PeerId)> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.posted.lock() {
            Ok(mut posted) => *posted = Some(tx),
            Err(poisoned) => *poisoned.into_inner() = Some(tx),
        }
        rx
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.index.read().map(|index| index.blocks.len()).unwrap_or(0)
    }

    /// Check if the chain has no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ChainIndex>, OracleError> {
        self.index
            .read()
            .map_err(|_| OracleError("chain index lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ChainIndex>, OracleError> {
        self.index
            .write()
            .map_err(|_| OracleError("chain index lock poisoned".into()))
    }
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainOracle for MemoryChain {
    fn tip(&self) -> Result<Block, GetTipError> {
        let index = self.read()?;
        let tip = index.tip.ok_or(GetTipError::Empty)?;
        index
            .blocks
            .get(&tip)
            .cloned()
            .ok_or(GetTipError::Missing(tip))
    }

    fn block_header(&self, hash: &HeaderHash) -> Result<Option<BlockHeader>, OracleError> {
        Ok(self.read()?.blocks.get(hash).map(|b| b.header.clone()))
    }

    fn block_headers(
        &self,
        checkpoints: &[HeaderHash],
        to: Option<HeaderHash>,
    ) -> Result<NewestFirst<BlockHeader>, GetBlockHeadersError> {
        let index = self.read()?;
        let end = match to {
            Some(hash) => hash,
            None => index.tip.ok_or(GetTipError::Empty)?,
        };

        let mut headers = Vec::new();
        let mut hash = end;
        while !checkpoints.contains(&hash) {
            let block = match index.blocks.get(&hash) {
                Some(block) => block,
                None if headers.is_empty() => {
                    return Err(GetBlockHeadersError::UnknownHeader(hash))
                }
                None => return Err(GetBlockHeadersError::NoCheckpoint(checkpoints.len())),
            };
            headers.push(block.header.clone());
            if block.header.is_first() {
                return Err(GetBlockHeadersError::NoCheckpoint(checkpoints.len()));
            }
            hash = block.prev_hash();
        }

        // Keep the oldest headers so the requester advances from its checkpoint.
        if headers.len() > self.header_limit {
            let excess = headers.len() - self.header_limit;
            headers.drain(..excess);
        }

        NewestFirst::new(headers).map_err(|_| GetBlockHeadersError::Empty)
    }

    fn header_hashes_between(
        &self,
        from: &HeaderHash,
        to: &HeaderHash,
        limit: usize,
    ) -> Result<Option<OldestFirst<HeaderHash>>, OracleError> {
        let index = self.read()?;

        let mut hashes = Vec::new();
        let mut hash = *to;
        loop {
            let block = match index.blocks.get(&hash) {
                Some(block) => block,
                None => return Ok(None),
            };
            hashes.push(hash);
            if hashes.len() > limit {
                return Ok(None);
            }
            if hash == *from {
                break;
            }
            if block.header.is_first() {
                return Ok(None);
            }
            hash = block.prev_hash();
        }

        hashes.reverse();
        Ok(OldestFirst::new(hashes).ok())
    }

    fn block(&self, hash: &HeaderHash) -> Result<Option<Block>, OracleError> {
        Ok(self.read()?.blocks.get(hash).cloned())
    }

    fn blocks(
        &self,
        checkpoints: &[HeaderHash],
        to: Option<HeaderHash>,
    ) -> Result<OldestFirst<Block>, GetBlockHeadersError> {
        let headers = self.block_headers(checkpoints, to)?.into_oldest_first();
        let index = self.read()?;

        let mut blocks = Vec::with_capacity(headers.len());
        for header in headers.iter() {
            let hash = header.hash();
            let block = index
                .blocks
                .get(&hash)
                .cloned()
                .ok_or_else(|| OracleError(format!("block {} is missing", hash.short())))?;
            blocks.push(block);
        }

        OldestFirst::new(blocks).map_err(|_| GetBlockHeadersError::Empty)
    }

    fn post_block_header(&self, header: BlockHeader, peer: PeerId) {
        debug!(%peer, height = header.height, hash = %header.hash().short(), "Header posted");

        let posted = match self.posted.lock() {
            Ok(posted) => posted,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(tx) = posted.as_ref() {
            if tx.send((header, peer)).is_err() {
                warn!(%peer, "Header subscriber dropped");
            }
        }
    }

    fn recovery_in_progress(&self) -> bool {
        self.recovery.load(Ordering::SeqCst)
    }

    fn security_params(&self) -> SecurityParams {
        self.security.clone()
    }
}
