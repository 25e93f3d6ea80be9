//! Block structure for the Strand protocol.
//!
//! A block is a header plus a body of opaque transaction payloads. Headers
//! are either main headers or epoch-boundary headers; the distinction matters
//! when a peer asks for "the newest main header".

#[allow(clippy::module_inception)]
mod block;
mod header;

pub use block::Block;
pub use header::{BlockHeader, BlockKind, HeaderHash};
