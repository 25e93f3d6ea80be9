//! Concrete conversation transports.
//!
//! - `memory`: tokio channels, for tests and in-process networks
//! - `tcp`: one framed TCP connection per conversation

pub mod memory;
pub mod tcp;

pub use memory::{listeners_responder, ChannelConversation, MemoryNetwork, Responder};
pub use tcp::{serve_tcp, FramedConversation, TcpEnqueuer};
