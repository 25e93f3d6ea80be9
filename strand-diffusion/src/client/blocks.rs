//! Block retrieval from a single peer.

use std::sync::Arc;

use strand_core::{Block, BlockHeader, HeaderHash, NewestFirst, OldestFirst};
use tracing::{debug, warn};

use crate::config::DiffusionConfig;
use crate::conversation::{BoxConversation, ConversationKind};
use crate::enqueue::{enqueue, expect_single_respondent, PeerEnqueuer};
use crate::error::{DiffusionError, DiffusionResult, GetBlocksError};
use crate::monoid::Monoid;
use crate::oracle::ChainOracle;
use crate::peer::{PeerId, PeerSelector};
use crate::protocol::Message;

/// Download the blocks between the newest of `checkpoints` and `tip_header`
/// from `peer`.
///
/// Headers are requested first and only their ends are used to ask for the
/// block range; the peer must then send exactly as many blocks as it sent
/// headers. When the only checkpoint is the tip itself the header round is
/// skipped and just the tip block is fetched.
pub async fn get_blocks(
    oracle: &dyn ChainOracle,
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    peer: PeerId,
    tip_header: &BlockHeader,
    checkpoints: &[HeaderHash],
) -> Result<NewestFirst<Block>, GetBlocksError> {
    let tip_hash = tip_header.hash();

    let (oldest, newest, count) = if checkpoints == [tip_hash] {
        debug!(%peer, tip = %tip_hash.short(), "Checkpoint is the tip, fetching one block");
        (tip_hash, tip_hash, 1)
    } else {
        let headers = match request_headers(enqueuer, config, peer, checkpoints, tip_hash).await {
            Ok(headers) => headers,
            Err(e) => {
                warn!(
                    %peer,
                    error = %e,
                    local_recovery = oracle.recovery_in_progress(),
                    "Header request failed"
                );
                return Err(e);
            }
        };
        (headers.oldest().hash(), headers.newest().hash(), headers.len())
    };

    let blocks = request_block_range(enqueuer, config, peer, oldest, newest, count).await?;
    debug!(%peer, count = blocks.len(), "Downloaded blocks");
    Ok(blocks.into_newest_first())
}

/// Header round of [`get_blocks`].
async fn request_headers(
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    peer: PeerId,
    checkpoints: &[HeaderHash],
    tip_hash: HeaderHash,
) -> Result<NewestFirst<BlockHeader>, GetBlocksError> {
    let request = Message::get_headers(checkpoints.to_vec(), Some(tip_hash));
    let limit = config.limits.headers;

    let pending = enqueue(
        enqueuer,
        ConversationKind::RequestHeaders,
        &PeerSelector::Only(peer),
        |_peer| {
            let request = request.clone();
            move |mut conv: BoxConversation| async move {
                conv.send(request).await?;
                match conv.recv(limit).await? {
                    Some(Message::Headers(response)) => Ok(response.headers),
                    Some(Message::NoHeaders(reason)) => Err(GetBlocksError::NoHeaders(reason)),
                    None => Err(GetBlocksError::HeadersNotSent),
                    Some(other) => {
                        warn!(peer = %conv.peer(), message = other.name(), "Expected headers");
                        Err(DiffusionError::DialogUnexpected(format!(
                            "expected headers, got {}",
                            other.name()
                        ))
                        .into())
                    }
                }
            }
        },
    );

    expect_single_respondent(pending).await
}

/// Block round of [`get_blocks`]: ask for `oldest..=newest` and read exactly
/// `count` blocks.
async fn request_block_range(
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    peer: PeerId,
    oldest: HeaderHash,
    newest: HeaderHash,
    count: usize,
) -> Result<OldestFirst<Block>, GetBlocksError> {
    let limit = config.limits.block;

    let pending = enqueue(
        enqueuer,
        ConversationKind::RequestBlocks,
        &PeerSelector::Only(peer),
        |_peer| {
            move |mut conv: BoxConversation| async move {
                conv.send(Message::get_blocks(oldest, newest)).await?;

                let peer = conv.peer();
                let mut blocks = Vec::with_capacity(count);
                for index in 0..count {
                    match conv.recv(limit).await? {
                        Some(Message::Block(response)) => blocks.push(response.block),
                        Some(Message::NoBlock(reason)) => {
                            warn!(%peer, index, expected = count, %reason, "Peer refused block");
                            return Err(GetBlocksError::BlockRefused { index, reason });
                        }
                        None => {
                            warn!(%peer, index, expected = count, "Block stream cut short");
                            return Err(GetBlocksError::CutShort { index });
                        }
                        Some(other) => {
                            warn!(%peer, index, message = other.name(), "Expected block");
                            return Err(DiffusionError::DialogUnexpected(format!(
                                "expected block, got {}",
                                other.name()
                            ))
                            .into());
                        }
                    }
                }

                OldestFirst::new(blocks).map_err(|_| {
                    warn!(%peer, "Peer gave an empty blocks list");
                    GetBlocksError::EmptyBlocks
                })
            }
        },
    );

    expect_single_respondent(pending).await
}

/// Stream blocks between the newest of `checkpoints` and `tip_header` from
/// `peer`, folding each through `per_block` in arrival order.
///
/// The stream ends when the peer sends `NoBlock` or closes; a short stream
/// still yields the blocks folded so far.
pub async fn stream_blocks<T, F>(
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    peer: PeerId,
    tip_header: &BlockHeader,
    checkpoints: &[HeaderHash],
    per_block: F,
) -> DiffusionResult<T>
where
    T: Monoid + Send + 'static,
    F: Fn(Block) -> T + Clone + Send + 'static,
{
    let request = Message::get_headers(checkpoints.to_vec(), Some(tip_header.hash()));
    let limit = config.limits.block;

    let pending = enqueue(
        enqueuer,
        ConversationKind::StreamBlocks,
        &PeerSelector::Only(peer),
        |_peer| {
            let request = request.clone();
            let per_block = per_block.clone();
            move |mut conv: BoxConversation| async move {
                let peer = conv.peer();
                conv.send(request).await?;

                let mut acc = T::empty();
                let mut received = 0usize;
                loop {
                    match conv.recv(limit).await? {
                        Some(Message::Block(response)) => {
                            acc = acc.combine(per_block(response.block));
                            received += 1;
                        }
                        Some(Message::NoBlock(reason)) => {
                            debug!(%peer, received, %reason, "Block stream ended by peer");
                            break;
                        }
                        None => {
                            debug!(%peer, received, "Block stream closed");
                            break;
                        }
                        Some(other) => {
                            warn!(%peer, received, message = other.name(), "Expected block");
                            return Err(DiffusionError::DialogUnexpected(format!(
                                "expected block, got {}",
                                other.name()
                            )));
                        }
                    }
                }
                Ok(acc)
            }
        },
    );

    expect_single_respondent(pending).await
}
