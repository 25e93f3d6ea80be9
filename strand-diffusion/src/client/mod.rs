//! Client side of the diffusion protocol.
//!
//! Every operation opens conversations through a [`PeerEnqueuer`]. Operations
//! aimed at one peer go through `expect_single_respondent`, so reaching zero
//! or several peers is a `DialogUnexpected` failure.
//!
//! [`PeerEnqueuer`]: crate::enqueue::PeerEnqueuer

mod announce;
mod blocks;
mod tip;

pub use announce::announce_block_header;
pub use blocks::{get_blocks, stream_blocks};
pub use tip::request_tip;
