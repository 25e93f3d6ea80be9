//! Block and header diffusion for the Strand protocol.
//!
//! This crate moves block headers and block bodies between peers:
//!
//! - Tip requests and header announcements fanned out to many peers
//! - Range-bounded and streaming block downloads from a single peer
//! - Header and block serving, gated by recovery mode
//! - In-memory and TCP transports for conversations
//!
//! # Architecture
//!
//! Every logical request runs in its own conversation, and every conversation
//! in its own tokio task. Chain state is only reached through the
//! [`ChainOracle`] trait.
//!
//! ```text
//! client op ──enqueue──► PeerEnqueuer ──open──► Conversation ◄──► Listeners
//!     │                                                              │
//!     └────────────────────► ChainOracle ◄───────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use strand_diffusion::{
//!     get_blocks, ChainOracle, DiffusionConfig, MemoryChain, PeerEnqueuer, PeerId, TcpEnqueuer,
//! };
//!
//! let config = DiffusionConfig::default();
//! let chain = Arc::new(MemoryChain::from_blocks(MemoryChain::generate(10, 5))?);
//! let enqueuer: Arc<dyn PeerEnqueuer> =
//!     Arc::new(TcpEnqueuer::new([(PeerId(1), "127.0.0.1:3000".parse()?)], &config));
//!
//! let tip = chain.tip()?;
//! let blocks = get_blocks(&*chain, &enqueuer, &config, PeerId(1), &tip.header, &[tip.hash()]).await?;
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod enqueue;
pub mod error;
pub mod monoid;
pub mod oracle;
pub mod peer;
pub mod protocol;
pub mod server;
pub mod transport;

// Re-export main types
pub use client::{announce_block_header, get_blocks, request_tip, stream_blocks};
pub use config::{
    AttackTarget, AttackType, DiffusionConfig, MessageLimits, SecurityParams, MAX_MESSAGE_SIZE,
    NETWORK_MAGIC,
};
pub use conversation::{BoxConversation, Conversation, ConversationKind};
pub use enqueue::{enqueue, expect_single_respondent, PeerEnqueuer, Pending};
pub use error::{DiffusionError, DiffusionResult, GetBlocksError};
pub use monoid::Monoid;
pub use oracle::{ChainOracle, GetBlockHeadersError, GetTipError, MemoryChain, OracleError};
pub use peer::{PeerId, PeerSelector};
pub use protocol::Message;
pub use server::{
    handle_block_headers, handle_get_blocks, handle_headers_communication, handle_stream_blocks,
    Listeners,
};
pub use transport::{serve_tcp, ChannelConversation, MemoryNetwork, TcpEnqueuer};
