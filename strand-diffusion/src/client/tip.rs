//! Tip requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use strand_core::BlockHeader;
use tracing::{debug, warn};

use crate::config::DiffusionConfig;
use crate::conversation::{BoxConversation, ConversationKind};
use crate::enqueue::{enqueue, PeerEnqueuer, Pending};
use crate::error::{DiffusionError, DiffusionResult};
use crate::peer::{PeerId, PeerSelector};
use crate::protocol::Message;

/// Ask every selected peer for its newest main header and run `on_tip` on
/// each answer.
///
/// A peer answering with anything other than exactly one header fails its
/// own handle with `DialogUnexpected`; other peers are unaffected.
pub fn request_tip<T, F, Fut>(
    enqueuer: &Arc<dyn PeerEnqueuer>,
    config: &DiffusionConfig,
    selector: &PeerSelector,
    on_tip: F,
) -> HashMap<PeerId, Pending<T>>
where
    F: Fn(BlockHeader, PeerId) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let limit = config.limits.headers;

    enqueue(enqueuer, ConversationKind::RequestHeaders, selector, |_peer| {
        let on_tip = on_tip.clone();
        move |mut conv: BoxConversation| async move {
            let peer = conv.peer();
            conv.send(Message::get_headers(Vec::new(), None)).await?;
            let header = expect_tip(peer, conv.recv(limit).await?)?;

            debug!(%peer, height = header.height, hash = %header.hash().short(), "Received tip");
            Ok::<_, DiffusionError>(on_tip(header, peer).await)
        }
    })
}

/// The single header of a tip response.
fn expect_tip(peer: PeerId, reply: Option<Message>) -> DiffusionResult<BlockHeader> {
    let reason = match reply {
        Some(Message::Headers(response)) if response.headers.len() == 1 => {
            return Ok(response.headers.newest().clone())
        }
        Some(Message::Headers(response)) => {
            warn!(%peer, count = response.headers.len(), "Expected one tip header");
            format!("expected one tip header, got {}", response.headers.len())
        }
        Some(Message::NoHeaders(reason)) => {
            warn!(%peer, %reason, "Peer refused tip");
            format!("peer refused tip: {}", reason)
        }
        Some(other) => {
            warn!(%peer, message = other.name(), "Expected tip headers");
            format!("expected headers, got {}", other.name())
        }
        None => {
            warn!(%peer, "Peer closed before sending tip");
            "peer closed before sending tip".to_string()
        }
    };
    Err(DiffusionError::DialogUnexpected(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MemoryChain;
    use crate::transport::{MemoryNetwork, Responder};
    use futures::FutureExt;
    use std::net::SocketAddr;
    use strand_core::NewestFirst;

    fn addr() -> SocketAddr {
        "127.0.0.1:3000".parse().unwrap()
    }

    /// Responder that reads one request and answers with `reply`, or just
    /// closes when `reply` is `None`.
    fn scripted(reply: Option<Message>) -> Responder {
        Arc::new(move |_kind: ConversationKind, mut conv: BoxConversation| {
            let reply = reply.clone();
            async move {
                let _ = conv.recv(usize::MAX).await;
                if let Some(reply) = reply {
                    let _ = conv.send(reply).await;
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_bad_peers_fail_independently() {
        let blocks = MemoryChain::generate(4, 10);
        let good = blocks[3].header.clone();
        let two = NewestFirst::new(vec![blocks[3].header.clone(), blocks[2].header.clone()])
            .unwrap();

        let network = MemoryNetwork::new(PeerId(0));
        network.add_peer(PeerId(1), addr(), scripted(Some(Message::headers(NewestFirst::one(good.clone())))));
        network.add_peer(PeerId(2), addr(), scripted(Some(Message::headers(two))));
        network.add_peer(PeerId(3), addr(), scripted(Some(Message::NoHeaders("busy".into()))));
        network.add_peer(PeerId(4), addr(), scripted(None));
        network.add_peer(PeerId(5), addr(), scripted(Some(Message::NoBlock("?".into()))));
        let enqueuer: Arc<dyn PeerEnqueuer> = Arc::new(network);

        let pending = request_tip(
            &enqueuer,
            &DiffusionConfig::default(),
            &PeerSelector::All,
            |header: BlockHeader, peer: PeerId| async move { (header.height, peer) },
        );
        assert_eq!(pending.len(), 5);

        let mut results = HashMap::new();
        for (peer, handle) in pending {
            results.insert(peer, handle.wait().await);
        }

        assert_eq!(results[&PeerId(1)].as_ref().unwrap(), &(3, PeerId(1)));
        for peer in [2, 3, 4, 5] {
            assert!(
                matches!(results[&PeerId(peer)], Err(DiffusionError::DialogUnexpected(_))),
                "peer {} should fail",
                peer
            );
        }
    }
}
