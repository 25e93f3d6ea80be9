//! Fan-out of conversations to selected peers.
//!
//! The enqueuer resolves a [`PeerSelector`] to peers and opens conversations.
//! [`enqueue`] runs one tokio task per selected peer and hands back a
//! [`Pending`] handle for each, so a failing peer never aborts its siblings.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::conversation::{BoxConversation, ConversationKind};
use crate::error::{DiffusionError, DiffusionResult};
use crate::peer::{PeerId, PeerSelector};

/// Opens conversations to known peers.
#[async_trait]
pub trait PeerEnqueuer: Send + Sync {
    /// Peers matched by `selector`.
    fn select(&self, selector: &PeerSelector) -> Vec<PeerId>;

    /// Open a conversation of the given kind to `peer`.
    async fn open(&self, peer: PeerId, kind: ConversationKind) -> DiffusionResult<BoxConversation>;

    /// Network address the peer is reached at, if known.
    fn peer_addr(&self, peer: PeerId) -> Option<SocketAddr>;
}

/// Handle to one peer's conversation task.
#[derive(Debug)]
pub struct Pending<T, E = DiffusionError> {
    peer: PeerId,
    handle: JoinHandle<Result<T, E>>,
}

impl<T, E> Pending<T, E>
where
    E: From<DiffusionError>,
{
    /// Wrap a spawned conversation task.
    pub fn new(peer: PeerId, handle: JoinHandle<Result<T, E>>) -> Self {
        Self { peer, handle }
    }

    /// The peer this conversation runs against.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Wait for the conversation to finish.
    pub async fn wait(self) -> Result<T, E> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(DiffusionError::TaskFailed(e.to_string()).into()),
        }
    }

    /// Abort the conversation task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Open a conversation of `kind` to every peer matched by `selector` and run
/// the handler built by `handler_for` on it, one task per peer.
pub fn enqueue<T, E, F, H, Fut>(
    enqueuer: &Arc<dyn PeerEnqueuer>,
    kind: ConversationKind,
    selector: &PeerSelector,
    mut handler_for: F,
) -> HashMap<PeerId, Pending<T, E>>
where
    F: FnMut(PeerId) -> H,
    H: FnOnce(BoxConversation) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<DiffusionError> + Send + 'static,
{
    let peers = enqueuer.select(selector);
    debug!(?kind, ?selector, peers = peers.len(), "Enqueueing conversations");

    let mut pending = HashMap::with_capacity(peers.len());
    for peer in peers {
        let handler = handler_for(peer);
        let enqueuer = Arc::clone(enqueuer);

        let handle = tokio::spawn(async move {
            match enqueuer.open(peer, kind).await {
                Ok(conv) => handler(conv).await,
                Err(e) => Err(E::from(e)),
            }
        });
        pending.insert(peer, Pending::new(peer, handle));
    }

    pending
}

/// Collapse a fan-out that must have reached exactly one peer.
///
/// Zero or several respondents fail with `DialogUnexpected`; in the latter
/// case every task is aborted.
pub async fn expect_single_respondent<T, E>(pending: HashMap<PeerId, Pending<T, E>>) -> Result<T, E>
where
    E: From<DiffusionError>,
{
    let count = pending.len();
    let mut handles = pending.into_values();

    match (handles.next(), handles.next()) {
        (Some(only), None) => only.wait().await,
        (None, _) => {
            warn!("No peer responded");
            Err(DiffusionError::DialogUnexpected("no peer responded".into()).into())
        }
        (Some(first), Some(second)) => {
            warn!(
                respondents = count,
                first = %first.peer(),
                second = %second.peer(),
                "Expected exactly one respondent"
            );
            first.abort();
            second.abort();
            for rest in handles {
                rest.abort();
            }
            Err(DiffusionError::DialogUnexpected(format!(
                "expected exactly one respondent, got {}",
                count
            ))
            .into())
        }
    }
}
