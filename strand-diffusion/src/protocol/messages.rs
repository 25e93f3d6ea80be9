//! Diffusion protocol message definitions.
//!
//! All messages are serialized with the deterministic bincode options from
//! `strand_core::serialization`.

use serde::{Deserialize, Serialize};
use strand_core::{Block, BlockHeader, HeaderHash, NewestFirst};

/// All diffusion messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Request headers after the newest known checkpoint, up to `to`.
    GetHeaders(GetHeadersMessage),

    /// Headers response, newest first.
    Headers(HeadersMessage),

    /// Header request refused, with a reason.
    NoHeaders(String),

    /// Request every block in the closed range `from..=to`.
    GetBlocks(GetBlocksMessage),

    /// One block of a block response.
    Block(BlockMessage),

    /// Block request refused or finished, with a reason.
    NoBlock(String),

    /// Unsolicited announcement of a new header.
    AnnounceBlockHeader(AnnounceHeaderMessage),
}

/// Header range request.
///
/// An empty `checkpoints` list means "no checkpoint": combined with
/// `to: None` it asks for the newest main header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetHeadersMessage {
    /// Hashes the requester already has.
    pub checkpoints: Vec<HeaderHash>,
    /// Newest header wanted. Defaults to the responder's tip.
    pub to: Option<HeaderHash>,
}

/// Headers response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadersMessage {
    /// The headers, newest first.
    pub headers: NewestFirst<BlockHeader>,
}

/// Closed block range request; `to` is the newest end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksMessage {
    /// Oldest block wanted.
    pub from: HeaderHash,
    /// Newest block wanted.
    pub to: HeaderHash,
}

/// A single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMessage {
    /// The block.
    pub block: Block,
}

/// Header announcement. Announcers send exactly one header; the origin is
/// whoever sent the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceHeaderMessage {
    /// Announced headers, newest first.
    pub headers: NewestFirst<BlockHeader>,
}

impl Message {
    /// Build a `GetHeaders` request.
    pub fn get_headers(checkpoints: Vec<HeaderHash>, to: Option<HeaderHash>) -> Self {
        Message::GetHeaders(GetHeadersMessage { checkpoints, to })
    }

    /// Build a `GetBlocks` request.
    pub fn get_blocks(from: HeaderHash, to: HeaderHash) -> Self {
        Message::GetBlocks(GetBlocksMessage { from, to })
    }

    /// Build a `Headers` response.
    pub fn headers(headers: NewestFirst<BlockHeader>) -> Self {
        Message::Headers(HeadersMessage { headers })
    }

    /// Build a `Block` response.
    pub fn block(block: Block) -> Self {
        Message::Block(BlockMessage { block })
    }

    /// Build an announcement of a single header.
    pub fn announce(header: BlockHeader) -> Self {
        Message::AnnounceBlockHeader(AnnounceHeaderMessage {
            headers: NewestFirst::one(header),
        })
    }

    /// Get a human-readable name for the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Message::GetHeaders(_) => "getheaders",
            Message::Headers(_) => "headers",
            Message::NoHeaders(_) => "noheaders",
            Message::GetBlocks(_) => "getblocks",
            Message::Block(_) => "block",
            Message::NoBlock(_) => "noblock",
            Message::AnnounceBlockHeader(_) => "announceheader",
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::GetHeaders(g) => write!(
                f,
                "GetHeaders(checkpoints={}, to={:?})",
                g.checkpoints.len(),
                g.to
            ),
            Message::Headers(h) => write!(f, "Headers(count={})", h.headers.len()),
            Message::NoHeaders(reason) => write!(f, "NoHeaders({})", reason),
            Message::GetBlocks(g) => write!(f, "GetBlocks(from={:?}, to={:?})", g.from, g.to),
            Message::Block(b) => write!(f, "Block(height={})", b.block.height()),
            Message::NoBlock(reason) => write!(f, "NoBlock({})", reason),
            Message::AnnounceBlockHeader(a) => write!(
                f,
                "AnnounceBlockHeader(count={}, height={})",
                a.headers.len(),
                a.headers.newest().height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names() {
        assert_eq!(Message::NoHeaders("x".into()).name(), "noheaders");
        assert_eq!(Message::get_headers(vec![], None).name(), "getheaders");
        assert_eq!(
            Message::get_blocks(HeaderHash::ZERO, HeaderHash::ZERO).name(),
            "getblocks"
        );
    }

    #[test]
    fn test_message_display() {
        let msg = Message::NoBlock("done".into());
        assert_eq!(format!("{}", msg), "NoBlock(done)");

        let msg = Message::get_headers(vec![HeaderHash::ZERO; 3], None);
        assert_eq!(format!("{}", msg), "GetHeaders(checkpoints=3, to=None)");
    }
}
