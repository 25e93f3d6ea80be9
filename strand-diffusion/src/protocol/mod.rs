//! Diffusion wire protocol.
//!
//! This module contains:
//! - Message definitions for header and block exchange
//! - Length-prefixed framing codec used by the TCP transport

pub mod framing;
pub mod messages;

// Re-export main types
pub use framing::MessageCodec;
pub use messages::{
    AnnounceHeaderMessage, BlockMessage, GetBlocksMessage, GetHeadersMessage, HeadersMessage,
    Message,
};
