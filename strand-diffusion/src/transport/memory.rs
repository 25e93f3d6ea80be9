//! In-process transport over tokio channels.
//!
//! [`ChannelConversation::pair`] creates both ends of one conversation.
//! [`MemoryNetwork`] is a peer enqueuer whose peers are responder callbacks,
//! usually wrapping a remote node's [`Listeners`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use strand_core::serialization::serialized_size;
use tokio::sync::mpsc;
use tracing::trace;

use crate::conversation::{BoxConversation, Conversation, ConversationKind};
use crate::enqueue::PeerEnqueuer;
use crate::error::{DiffusionError, DiffusionResult};
use crate::peer::{PeerId, PeerSelector};
use crate::protocol::Message;
use crate::server::Listeners;

/// Messages buffered per direction before `send` waits.
const CHANNEL_CAPACITY: usize = 64;

/// One end of an in-memory conversation.
#[derive(Debug)]
pub struct ChannelConversation {
    peer: PeerId,
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
}

impl ChannelConversation {
    /// Create a conversation between `a` and `b`. The first end is held by
    /// `a` and talks to `b`; the second is held by `b` and talks to `a`.
    pub fn pair(a: PeerId, b: PeerId) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (b_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                peer: b,
                tx: a_tx,
                rx: a_rx,
            },
            Self {
                peer: a,
                tx: b_tx,
                rx: b_rx,
            },
        )
    }
}

#[async_trait]
impl Conversation for ChannelConversation {
    fn peer(&self) -> PeerId {
        self.peer
    }

    async fn send(&mut self, msg: Message) -> DiffusionResult<()> {
        trace!(peer = %self.peer, %msg, "Sending");
        self.tx
            .send(msg)
            .await
            .map_err(|_| DiffusionError::ConversationClosed(self.peer))
    }

    async fn recv(&mut self, limit: usize) -> DiffusionResult<Option<Message>> {
        let msg = match self.rx.recv().await {
            Some(msg) => msg,
            None => return Ok(None),
        };

        let size = serialized_size(&msg)? as usize;
        if size > limit {
            return Err(DiffusionError::MessageTooLarge { size, max: limit });
        }
        Ok(Some(msg))
    }
}

/// Callback answering conversations opened to an in-memory peer.
pub type Responder =
    Arc<dyn Fn(ConversationKind, BoxConversation) -> BoxFuture<'static, ()> + Send + Sync>;

/// Responder that serves every conversation with `listeners`.
pub fn listeners_responder(listeners: Listeners) -> Responder {
    Arc::new(move |kind: ConversationKind, conv: BoxConversation| {
        let listeners = listeners.clone();
        async move {
            // Failures are logged by the listeners.
            let _ = listeners.handle(kind, conv).await;
        }
        .boxed()
    })
}

struct MemoryPeer {
    addr: SocketAddr,
    responder: Responder,
}

/// Peer enqueuer over in-process peers.
pub struct MemoryNetwork {
    local: PeerId,
    peers: RwLock<BTreeMap<PeerId, MemoryPeer>>,
}

impl MemoryNetwork {
    /// Create a network as seen from the node `local`.
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            peers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a peer reachable at `addr`, answered by `responder`.
    pub fn add_peer(&self, peer: PeerId, addr: SocketAddr, responder: Responder) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer, MemoryPeer { addr, responder });
    }

    /// Register a peer served by `listeners`.
    pub fn add_listeners(&self, peer: PeerId, addr: SocketAddr, listeners: Listeners) {
        self.add_peer(peer, addr, listeners_responder(listeners));
    }

    /// Forget a peer.
    pub fn remove_peer(&self, peer: PeerId) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&peer);
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoryNetwork")
            .field("local", &self.local)
            .field("peers", &peers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl PeerEnqueuer for MemoryNetwork {
    fn select(&self, selector: &PeerSelector) -> Vec<PeerId> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|peer| selector.accepts(peer))
            .copied()
            .collect()
    }

    async fn open(&self, peer: PeerId, kind: ConversationKind) -> DiffusionResult<BoxConversation> {
        let responder = self
            .peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&peer)
            .map(|p| Arc::clone(&p.responder))
            .ok_or(DiffusionError::PeerNotFound(peer))?;

        let (ours, theirs) = ChannelConversation::pair(self.local, peer);
        tokio::spawn(responder(kind, Box::new(theirs)));
        Ok(Box::new(ours))
    }

    fn peer_addr(&self, peer: PeerId) -> Option<SocketAddr> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&peer)
            .map(|p| p.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::HeaderHash;

    #[tokio::test]
    async fn test_pair_delivers_both_ways() {
        let (mut a, mut b) = ChannelConversation::pair(PeerId(1), PeerId(2));
        assert_eq!(a.peer(), PeerId(2));
        assert_eq!(b.peer(), PeerId(1));

        a.send(Message::NoHeaders("ping".into())).await.unwrap();
        assert_eq!(
            b.recv(usize::MAX).await.unwrap(),
            Some(Message::NoHeaders("ping".into()))
        );

        b.send(Message::NoBlock("pong".into())).await.unwrap();
        assert_eq!(
            a.recv(usize::MAX).await.unwrap(),
            Some(Message::NoBlock("pong".into()))
        );
    }

    #[tokio::test]
    async fn test_drop_closes_other_end() {
        let (mut a, b) = ChannelConversation::pair(PeerId(1), PeerId(2));
        drop(b);

        assert_eq!(a.recv(usize::MAX).await.unwrap(), None);
        assert!(matches!(
            a.send(Message::NoBlock("late".into())).await,
            Err(DiffusionError::ConversationClosed(PeerId(2)))
        ));
    }

    #[tokio::test]
    async fn test_recv_enforces_limit() {
        let (mut a, mut b) = ChannelConversation::pair(PeerId(1), PeerId(2));
        a.send(Message::get_headers(vec![HeaderHash::ZERO; 100], None))
            .await
            .unwrap();

        let result = b.recv(64).await;
        assert!(matches!(result, Err(DiffusionError::MessageTooLarge { max: 64, .. })));
    }

    #[tokio::test]
    async fn test_network_selects_and_opens() {
        let network = MemoryNetwork::new(PeerId(0));
        let addr: SocketAddr = "127.0.0.1:4001".parse().unwrap();

        let echo: Responder = Arc::new(|_kind: ConversationKind, mut conv: BoxConversation| {
            async move {
                while let Ok(Some(msg)) = conv.recv(usize::MAX).await {
                    if conv.send(msg).await.is_err() {
                        break;
                    }
                }
            }
            .boxed()
        });
        network.add_peer(PeerId(1), addr, echo.clone());
        network.add_peer(PeerId(2), addr, echo);

        assert_eq!(network.select(&PeerSelector::All), vec![PeerId(1), PeerId(2)]);
        assert_eq!(network.select(&PeerSelector::Only(PeerId(2))), vec![PeerId(2)]);
        assert_eq!(network.peer_addr(PeerId(1)), Some(addr));
        assert_eq!(network.peer_addr(PeerId(9)), None);

        let mut conv = network
            .open(PeerId(1), ConversationKind::RequestHeaders)
            .await
            .unwrap();
        assert_eq!(conv.peer(), PeerId(1));
        conv.send(Message::NoBlock("echo".into())).await.unwrap();
        assert_eq!(
            conv.recv(usize::MAX).await.unwrap(),
            Some(Message::NoBlock("echo".into()))
        );

        network.remove_peer(PeerId(1));
        let result = network.open(PeerId(1), ConversationKind::RequestHeaders).await;
        assert!(matches!(result, Err(DiffusionError::PeerNotFound(PeerId(1)))));
    }
}
