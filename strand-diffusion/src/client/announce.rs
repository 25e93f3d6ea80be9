//! Header announcements.

use std::collections::HashMap;
use std::sync::Arc;

use strand_core::BlockHeader;
use tracing::{debug, warn};

use crate::config::DiffusionConfig;
use crate::conversation::{BoxConversation, ConversationKind};
use crate::enqueue::{enqueue, PeerEnqueuer, Pending};
use crate::error::DiffusionError;
use crate::oracle::ChainOracle;
use crate::peer::{PeerId, PeerSelector};
use crate::protocol::Message;
use crate::server::handle_headers_communication;

/// Announce `header` to every selected peer, then keep each conversation
/// open as a header server so the peer can pull the headers behind it.
///
/// When the oracle's security policy simulates a `NoBlocks` attack against a peer's
/// address, that peer's conversation fails with `AttackNoBlocksTriggered`
/// instead of announcing.
pub fn announce_block_header(
    oracle: &Arc<dyn ChainOracle>,
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    selector: &PeerSelector,
    header: BlockHeader,
) -> HashMap<PeerId, Pending<()>> {
    let security = oracle.security_params();
    let config = Arc::new(config.clone());
    debug!(height = header.height, hash = %header.hash().short(), "Announcing header");

    enqueue(enqueuer, ConversationKind::AnnounceHeader, selector, |peer| {
        let attacked = enqueuer
            .peer_addr(peer)
            .map_or(false, |addr| security.targets_no_blocks(&addr));
        let oracle = Arc::clone(oracle);
        let config = Arc::clone(&config);
        let header = header.clone();

        move |mut conv: BoxConversation| async move {
            if attacked {
                warn!(%peer, "Simulated NoBlocks attack triggered");
                return Err(DiffusionError::AttackNoBlocksTriggered { peer });
            }

            conv.send(Message::announce(header)).await?;
            handle_headers_communication(oracle.as_ref(), &config, conv.as_mut()).await
        }
    })
}
