//! Conversations: ordered, bidirectional message exchanges with one peer.
//!
//! A conversation is opened per logical request. Transports implement
//! [`Conversation`]; the client and server protocols only see the trait.

use async_trait::async_trait;

use crate::error::{DiffusionError, DiffusionResult};
use crate::peer::PeerId;
use crate::protocol::Message;

/// What a conversation is for. The opener picks the kind and the listener
/// dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationKind {
    /// Header requests, answered by the header-serving loop.
    RequestHeaders,
    /// `GetBlocks` range requests.
    RequestBlocks,
    /// Header-range request answered with a block stream.
    StreamBlocks,
    /// Unsolicited header announcement.
    AnnounceHeader,
}

impl ConversationKind {
    /// Wire byte written before the first frame on stream transports.
    pub fn to_byte(self) -> u8 {
        match self {
            ConversationKind::RequestHeaders => 0x01,
            ConversationKind::RequestBlocks => 0x02,
            ConversationKind::StreamBlocks => 0x03,
            ConversationKind::AnnounceHeader => 0x04,
        }
    }

    /// Parse a wire byte.
    pub fn from_byte(byte: u8) -> DiffusionResult<Self> {
        match byte {
            0x01 => Ok(ConversationKind::RequestHeaders),
            0x02 => Ok(ConversationKind::RequestBlocks),
            0x03 => Ok(ConversationKind::StreamBlocks),
            0x04 => Ok(ConversationKind::AnnounceHeader),
            other => Err(DiffusionError::UnknownConversationKind(other)),
        }
    }
}

/// One side of a conversation with a single peer.
#[async_trait]
pub trait Conversation: Send {
    /// The peer on the other end.
    fn peer(&self) -> PeerId;

    /// Send a message.
    async fn send(&mut self, msg: Message) -> DiffusionResult<()>;

    /// Receive the next message, refusing anything larger than `limit`
    /// serialized bytes. `None` means the peer closed the conversation.
    async fn recv(&mut self, limit: usize) -> DiffusionResult<Option<Message>>;
}

/// Boxed conversation handed to protocol code.
pub type BoxConversation = Box<dyn Conversation>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_bytes() {
        for kind in [
            ConversationKind::RequestHeaders,
            ConversationKind::RequestBlocks,
            ConversationKind::StreamBlocks,
            ConversationKind::AnnounceHeader,
        ] {
            assert_eq!(ConversationKind::from_byte(kind.to_byte()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            ConversationKind::from_byte(0x00),
            Err(DiffusionError::UnknownConversationKind(0))
        ));
    }
}
