//! Header-serving loop.

use strand_core::{BlockHeader, NewestFirst};
use tracing::{debug, trace, warn};

use crate::config::DiffusionConfig;
use crate::conversation::Conversation;
use crate::error::{DiffusionError, DiffusionResult};
use crate::oracle::ChainOracle;
use crate::protocol::{GetHeadersMessage, Message};

/// Reason sent with every `NoHeaders` while the node is catching up.
pub const RECOVERY_REASON: &str = "server is in recovery mode";

/// Answer `GetHeaders` requests until the peer closes the conversation.
///
/// Each request gets exactly one `Headers` or `NoHeaders` reply; failures to
/// produce headers are reported to the peer and do not end the loop. Any
/// other message ends the conversation with `DialogUnexpected`.
pub async fn handle_headers_communication(
    oracle: &dyn ChainOracle,
    config: &DiffusionConfig,
    conv: &mut dyn Conversation,
) -> DiffusionResult<()> {
    let peer = conv.peer();

    loop {
        let request = match conv.recv(config.limits.request).await? {
            None => {
                trace!(%peer, "Header conversation closed by peer");
                return Ok(());
            }
            Some(Message::GetHeaders(request)) => request,
            Some(other) => {
                warn!(%peer, message = other.name(), "Expected getheaders");
                return Err(DiffusionError::DialogUnexpected(format!(
                    "expected getheaders, got {}",
                    other.name()
                )));
            }
        };

        if oracle.recovery_in_progress() {
            debug!(%peer, "Refusing headers while in recovery mode");
            conv.send(Message::NoHeaders(RECOVERY_REASON.to_string()))
                .await?;
            continue;
        }

        let response = match headers_for(oracle, &request) {
            Ok(headers) => {
                debug!(
                    %peer,
                    count = headers.len(),
                    newest = headers.newest().height,
                    "Serving headers"
                );
                Message::headers(headers)
            }
            Err(reason) => {
                debug!(%peer, %reason, "Cannot serve headers");
                Message::NoHeaders(reason)
            }
        };
        conv.send(response).await?;
    }
}

/// Resolve one header request against the oracle. The error is the reason
/// reported to the peer.
fn headers_for(
    oracle: &dyn ChainOracle,
    request: &GetHeadersMessage,
) -> Result<NewestFirst<BlockHeader>, String> {
    match (request.checkpoints.as_slice(), request.to) {
        ([], None) => newest_main_header(oracle).map(NewestFirst::one),
        ([], Some(hash)) => match oracle.block_header(&hash) {
            Ok(Some(header)) => Ok(NewestFirst::one(header)),
            Ok(None) => Err(format!("header {} not found", hash.short())),
            Err(e) => Err(e.to_string()),
        },
        (checkpoints, to) => oracle
            .block_headers(checkpoints, to)
            .map_err(|e| e.to_string()),
    }
}

/// The tip's header when the tip is a main block, otherwise its parent's.
/// A boundary tip without a stored parent reports itself.
fn newest_main_header(oracle: &dyn ChainOracle) -> Result<BlockHeader, String> {
    let tip = oracle.tip().map_err(|e| e.to_string())?;
    if tip.header.is_main() {
        return Ok(tip.header);
    }

    match oracle.block_header(&tip.prev_hash()) {
        Ok(Some(parent)) => Ok(parent),
        Ok(None) => Ok(tip.header),
        Err(e) => Err(e.to_string()),
    }
}
