//! Peer identification and selection.

use std::fmt;
use std::sync::Arc;

/// Opaque handle for a peer. Only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a new peer ID from a counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Which known peers an enqueued conversation goes to.
#[derive(Clone)]
pub enum PeerSelector {
    /// Every peer the enqueuer knows.
    All,
    /// One specific peer.
    Only(PeerId),
    /// Every peer for which the predicate holds.
    Matching(Arc<dyn Fn(&PeerId) -> bool + Send + Sync>),
}

impl PeerSelector {
    /// Selector built from a predicate.
    pub fn matching(pred: impl Fn(&PeerId) -> bool + Send + Sync + 'static) -> Self {
        PeerSelector::Matching(Arc::new(pred))
    }

    /// Check whether `peer` is selected.
    pub fn accepts(&self, peer: &PeerId) -> bool {
        match self {
            PeerSelector::All => true,
            PeerSelector::Only(only) => only == peer,
            PeerSelector::Matching(pred) => pred(peer),
        }
    }
}

impl fmt::Debug for PeerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSelector::All => write!(f, "All"),
            PeerSelector::Only(peer) => write!(f, "Only({})", peer),
            PeerSelector::Matching(_) => write!(f, "Matching(..)"),
        }
    }
}
