//! Server side of the diffusion protocol.
//!
//! Handlers answer peer-initiated conversations. [`Listeners`] dispatches an
//! inbound conversation to the handler for its [`ConversationKind`].

mod announce;
mod blocks;
mod headers;

pub use announce::handle_block_headers;
pub use blocks::{handle_get_blocks, handle_stream_blocks, NO_RANGE_REASON};
pub use headers::{handle_headers_communication, RECOVERY_REASON};

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::DiffusionConfig;
use crate::conversation::{BoxConversation, ConversationKind};
use crate::error::{DiffusionError, DiffusionResult};
use crate::oracle::ChainOracle;

/// Inbound conversation dispatcher.
#[derive(Clone)]
pub struct Listeners {
    oracle: Arc<dyn ChainOracle>,
    config: Arc<DiffusionConfig>,
}

impl Listeners {
    /// Create listeners serving from `oracle`.
    pub fn new(oracle: Arc<dyn ChainOracle>, config: DiffusionConfig) -> Self {
        Self {
            oracle,
            config: Arc::new(config),
        }
    }

    /// The diffusion configuration.
    pub fn config(&self) -> &DiffusionConfig {
        &self.config
    }

    /// Run the handler for `kind` on an inbound conversation.
    ///
    /// Failures are logged here with the peer id; the result is returned for
    /// callers that want it.
    pub async fn handle(&self, kind: ConversationKind, mut conv: BoxConversation) -> DiffusionResult<()> {
        let peer = conv.peer();
        let oracle = self.oracle.as_ref();
        let config = self.config.as_ref();
        debug!(%peer, ?kind, "Inbound conversation");

        let result = match kind {
            ConversationKind::RequestHeaders => {
                handle_headers_communication(oracle, config, conv.as_mut()).await
            }
            ConversationKind::RequestBlocks => handle_get_blocks(oracle, config, conv.as_mut()).await,
            ConversationKind::StreamBlocks => {
                handle_stream_blocks(oracle, config, conv.as_mut()).await
            }
            ConversationKind::AnnounceHeader => {
                handle_block_headers(oracle, config, conv.as_mut()).await
            }
        };

        match &result {
            Ok(()) => debug!(%peer, ?kind, "Inbound conversation finished"),
            Err(e @ DiffusionError::InconsistentState(_)) => {
                error!(%peer, ?kind, error = %e, "Inbound conversation hit inconsistent state")
            }
            Err(e) => warn!(%peer, ?kind, error = %e, "Inbound conversation failed"),
        }
        result
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
