//! Block-serving handlers.

use tracing::{debug, error, warn};

use crate::config::DiffusionConfig;
use crate::conversation::Conversation;
use crate::error::{DiffusionError, DiffusionResult};
use crate::oracle::ChainOracle;
use crate::protocol::Message;

/// Reason sent when a `GetBlocks` range cannot be resolved.
pub const NO_RANGE_REASON: &str = "header range lookup returned nothing";

/// Serve one `GetBlocks{from, to}` request: every block in the range, oldest
/// first, one message each.
///
/// Recovery mode does not gate block serving.
pub async fn handle_get_blocks(
    oracle: &dyn ChainOracle,
    config: &DiffusionConfig,
    conv: &mut dyn Conversation,
) -> DiffusionResult<()> {
    let peer = conv.peer();

    let request = match conv.recv(config.limits.request).await? {
        None => return Ok(()),
        Some(Message::GetBlocks(request)) => request,
        Some(other) => {
            warn!(%peer, message = other.name(), "Expected getblocks");
            return Err(DiffusionError::DialogUnexpected(format!(
                "expected getblocks, got {}",
                other.name()
            )));
        }
    };

    let hashes = match oracle.header_hashes_between(
        &request.from,
        &request.to,
        config.max_blocks_per_request,
    ) {
        Ok(Some(hashes)) => hashes,
        Ok(None) => {
            debug!(%peer, from = %request.from.short(), to = %request.to.short(), "No range to serve");
            conv.send(Message::NoBlock(NO_RANGE_REASON.to_string()))
                .await?;
            return Ok(());
        }
        Err(e) => {
            conv.send(Message::NoBlock(e.to_string())).await?;
            return Ok(());
        }
    };

    debug!(%peer, count = hashes.len(), "Serving blocks");
    for hash in hashes {
        match oracle.block(&hash) {
            Ok(Some(block)) => conv.send(Message::block(block)).await?,
            Ok(None) => {
                let reason = format!("block {} is missing", hash.short());
                error!(%peer, %reason, "Header known without its block");
                conv.send(Message::NoBlock(reason.clone())).await?;
                return Err(DiffusionError::InconsistentState(reason));
            }
            Err(e) => {
                error!(%peer, error = %e, "Block lookup failed mid-range");
                conv.send(Message::NoBlock(e.to_string())).await?;
                return Err(DiffusionError::InconsistentState(e.to_string()));
            }
        }
    }

    Ok(())
}

/// Serve one header-range request with a stream of blocks, oldest first.
///
/// `([], None)` streams the tip block and `([], Some(h))` the block for `h`.
/// The stream ends when this side closes the conversation.
pub async fn handle_stream_blocks(
    oracle: &dyn ChainOracle,
    config: &DiffusionConfig,
    conv: &mut dyn Conversation,
) -> DiffusionResult<()> {
    let peer = conv.peer();

    let request = match conv.recv(config.limits.request).await? {
        None => return Ok(()),
        Some(Message::GetHeaders(request)) => request,
        Some(other) => {
            warn!(%peer, message = other.name(), "Expected getheaders");
            return Err(DiffusionError::DialogUnexpected(format!(
                "expected getheaders, got {}",
                other.name()
            )));
        }
    };

    match (request.checkpoints.as_slice(), request.to) {
        ([], None) => match oracle.tip() {
            Ok(tip) => conv.send(Message::block(tip)).await?,
            Err(e) => conv.send(Message::NoBlock(e.to_string())).await?,
        },
        ([], Some(hash)) => match oracle.block(&hash) {
            Ok(Some(block)) => conv.send(Message::block(block)).await?,
            Ok(None) => {
                let reason = format!("requested block {} is missing", hash.short());
                error!(%peer, %reason, "Cannot stream block");
                return Err(DiffusionError::InconsistentState(reason));
            }
            Err(e) => conv.send(Message::NoBlock(e.to_string())).await?,
        },
        (checkpoints, to) => match oracle.blocks(checkpoints, to) {
            Ok(blocks) => {
                debug!(%peer, count = blocks.len(), "Streaming blocks");
                for block in blocks {
                    conv.send(Message::block(block)).await?;
                }
            }
            Err(e) => conv.send(Message::NoBlock(e.to_string())).await?,
        },
    }

    Ok(())
}
