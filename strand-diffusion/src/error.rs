//! Diffusion error types.

use std::io;

use strand_core::SerializationError;
use thiserror::Error;

use crate::oracle::{GetBlockHeadersError, GetTipError, OracleError};
use crate::peer::PeerId;

/// Errors raised by diffusion conversations and transports.
#[derive(Debug, Error)]
pub enum DiffusionError {
    /// The peer broke the conversation contract: wrong message, wrong count,
    /// or an unexpected close.
    #[error("Unexpected dialog: {0}")]
    DialogUnexpected(String),

    /// Simulated block-withholding attack fired for this peer.
    #[error("Attack NoBlocks triggered against {peer}")]
    AttackNoBlocksTriggered { peer: PeerId },

    /// Local chain state contradicts itself. Fatal for the conversation.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize or deserialize a message.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Message exceeds the allowed size.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Invalid network magic bytes.
    #[error("Invalid network magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Conversation opened with a kind byte we do not know.
    #[error("Unknown conversation kind: {0:#04x}")]
    UnknownConversationKind(u8),

    /// The enqueuer has no route to this peer.
    #[error("Peer not found: {0}")]
    PeerNotFound(PeerId),

    /// Sending on a conversation whose remote end is gone.
    #[error("Conversation closed by {0}")]
    ConversationClosed(PeerId),

    /// The task running a conversation panicked or was aborted.
    #[error("Conversation task failed: {0}")]
    TaskFailed(String),

    /// The oracle could not produce a tip.
    #[error(transparent)]
    Tip(#[from] GetTipError),

    /// The oracle could not produce a header range.
    #[error(transparent)]
    Headers(#[from] GetBlockHeadersError),

    /// A plain oracle lookup failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl From<SerializationError> for DiffusionError {
    fn from(err: SerializationError) -> Self {
        DiffusionError::Serialization(err.to_string())
    }
}

/// Result type for diffusion operations.
pub type DiffusionResult<T> = Result<T, DiffusionError>;

/// Ways a range-bounded block download can fail.
#[derive(Debug, Error)]
pub enum GetBlocksError {
    /// The peer declined to send headers.
    #[error("Peer refused headers: {0}")]
    NoHeaders(String),

    /// The peer closed before answering the header request.
    #[error("Peer closed before sending headers")]
    HeadersNotSent,

    /// The peer answered a block slot with a refusal.
    #[error("Peer refused block {index}: {reason}")]
    BlockRefused { index: usize, reason: String },

    /// The peer closed before sending every requested block.
    #[error("Peer closed after {index} blocks")]
    CutShort { index: usize },

    /// No blocks were collected.
    #[error("Received no blocks")]
    EmptyBlocks,

    /// Conversation-level failure.
    #[error(transparent)]
    Diffusion(#[from] DiffusionError),
}
