//! TCP transport: one connection per conversation.
//!
//! The opener writes a single [`ConversationKind`] byte, then both sides
//! exchange frames produced by [`MessageCodec`]. Closing the connection
//! closes the conversation.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use strand_core::serialization::serialized_size;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::config::DiffusionConfig;
use crate::conversation::{BoxConversation, Conversation, ConversationKind};
use crate::enqueue::PeerEnqueuer;
use crate::error::{DiffusionError, DiffusionResult};
use crate::peer::{PeerId, PeerSelector};
use crate::protocol::{Message, MessageCodec};
use crate::server::Listeners;

/// First peer id handed to inbound connections; lower ids are configured peers.
const INBOUND_PEER_ID_BASE: u64 = 1_000_000;

/// A conversation over one framed TCP connection.
pub struct FramedConversation {
    peer: PeerId,
    framed: Framed<TcpStream, MessageCodec>,
}

impl FramedConversation {
    /// Wrap a connected stream whose kind byte has already been exchanged.
    pub fn new(peer: PeerId, stream: TcpStream, codec: MessageCodec) -> Self {
        Self {
            peer,
            framed: Framed::new(stream, codec),
        }
    }
}

#[async_trait]
impl Conversation for FramedConversation {
    fn peer(&self) -> PeerId {
        self.peer
    }

    async fn send(&mut self, msg: Message) -> DiffusionResult<()> {
        trace!(peer = %self.peer, %msg, "Sending");
        self.framed.send(msg).await
    }

    async fn recv(&mut self, limit: usize) -> DiffusionResult<Option<Message>> {
        let msg = match self.framed.next().await {
            None => return Ok(None),
            Some(result) => result?,
        };

        let size = serialized_size(&msg)? as usize;
        if size > limit {
            return Err(DiffusionError::MessageTooLarge { size, max: limit });
        }
        Ok(Some(msg))
    }
}

/// Peer enqueuer over a static table of TCP peers.
#[derive(Debug, Clone)]
pub struct TcpEnqueuer {
    peers: BTreeMap<PeerId, SocketAddr>,
    magic: [u8; 4],
    max_message_size: usize,
}

impl TcpEnqueuer {
    /// Create an enqueuer for `peers`, framing with `config`'s magic and limit.
    pub fn new(peers: impl IntoIterator<Item = (PeerId, SocketAddr)>, config: &DiffusionConfig) -> Self {
        Self {
            peers: peers.into_iter().collect(),
            magic: config.network_magic,
            max_message_size: config.max_message_size,
        }
    }

    /// Number of configured peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if no peers are configured.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[async_trait]
impl PeerEnqueuer for TcpEnqueuer {
    fn select(&self, selector: &PeerSelector) -> Vec<PeerId> {
        self.peers
            .keys()
            .filter(|peer| selector.accepts(peer))
            .copied()
            .collect()
    }

    async fn open(&self, peer: PeerId, kind: ConversationKind) -> DiffusionResult<BoxConversation> {
        let addr = *self
            .peers
            .get(&peer)
            .ok_or(DiffusionError::PeerNotFound(peer))?;

        let mut stream = TcpStream::connect(addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }
        stream.write_u8(kind.to_byte()).await?;

        debug!(%peer, %addr, ?kind, "Opened conversation");
        let codec = MessageCodec::new(self.magic, self.max_message_size);
        Ok(Box::new(FramedConversation::new(peer, stream, codec)))
    }

    fn peer_addr(&self, peer: PeerId) -> Option<SocketAddr> {
        self.peers.get(&peer).copied()
    }
}

/// Accept inbound conversations and serve them with `listeners` until a
/// shutdown signal arrives.
pub async fn serve_tcp(
    listener: TcpListener,
    listeners: Listeners,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> DiffusionResult<()> {
    info!(addr = %listener.local_addr()?, "Listening for inbound conversations");
    let mut next_peer_id = INBOUND_PEER_ID_BASE;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Inbound listener shutting down");
                return Ok(());
            }

            result = listener.accept() => {
                let (stream, addr) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };

                let peer = PeerId::new(next_peer_id);
                next_peer_id += 1;
                trace!(%addr, %peer, "Accepted inbound connection");

                let listeners = listeners.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, peer, listeners).await {
                        warn!(%addr, %peer, error = %e, "Inbound connection failed");
                    }
                });
            }
        }
    }
}

/// Read the kind byte and hand the conversation to the listeners.
async fn serve_connection(
    mut stream: TcpStream,
    peer: PeerId,
    listeners: Listeners,
) -> DiffusionResult<()> {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }

    let kind = ConversationKind::from_byte(stream.read_u8().await?)?;
    let config = listeners.config();
    let codec = MessageCodec::new(config.network_magic, config.max_message_size);
    let conv = FramedConversation::new(peer, stream, codec);

    // The listeners log their own failures.
    let _ = listeners.handle(kind, Box::new(conv)).await;
    Ok(())
}
