//! Unsolicited header announcements.

use tracing::{debug, warn};

use crate::config::DiffusionConfig;
use crate::conversation::Conversation;
use crate::error::{DiffusionError, DiffusionResult};
use crate::oracle::ChainOracle;
use crate::protocol::Message;

/// Receive one announcement and post its header to the oracle.
///
/// Announcers send exactly one header. An announcement carrying several is
/// discarded whole.
pub async fn handle_block_headers(
    oracle: &dyn ChainOracle,
    config: &DiffusionConfig,
    conv: &mut dyn Conversation,
) -> DiffusionResult<()> {
    let peer = conv.peer();

    let announcement = match conv.recv(config.limits.request).await? {
        None => return Ok(()),
        Some(Message::AnnounceBlockHeader(announcement)) => announcement,
        Some(other) => {
            warn!(%peer, message = other.name(), "Expected header announcement");
            return Err(DiffusionError::DialogUnexpected(format!(
                "expected announceheader, got {}",
                other.name()
            )));
        }
    };

    let count = announcement.headers.len();
    if count > 1 {
        // TODO: penalize peers that announce several headers at once.
        warn!(%peer, count, "Announcement with several headers, discarding");
        return Ok(());
    }

    let header = announcement.headers.newest().clone();
    debug!(%peer, height = header.height, hash = %header.hash().short(), "Header announced");
    oracle.post_block_header(header, peer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MemoryChain;
    use crate::peer::PeerId;
    use crate::protocol::AnnounceHeaderMessage;
    use crate::transport::memory::ChannelConversation;
    use strand_core::NewestFirst;

    #[tokio::test]
    async fn test_single_header_is_posted() {
        let blocks = MemoryChain::generate(3, 10);
        let chain = MemoryChain::new();
        let mut posted = chain.subscribe();
        let config = DiffusionConfig::default();
        let (mut client, mut server) = ChannelConversation::pair(PeerId(5), PeerId(6));

        client
            .send(Message::announce(blocks[2].header.clone()))
            .await
            .unwrap();
        handle_block_headers(&chain, &config, &mut server).await.unwrap();

        let (header, peer) = posted.try_recv().unwrap();
        assert_eq!(header, blocks[2].header);
        assert_eq!(peer, PeerId(5));
        assert!(posted.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_several_headers_are_discarded() {
        let blocks = MemoryChain::generate(3, 10);
        let chain = MemoryChain::new();
        let mut posted = chain.subscribe();
        let config = DiffusionConfig::default();
        let (mut client, mut server) = ChannelConversation::pair(PeerId(5), PeerId(6));

        let headers = NewestFirst::new(vec![blocks[2].header.clone(), blocks[1].header.clone()])
            .unwrap();
        client
            .send(Message::AnnounceBlockHeader(AnnounceHeaderMessage { headers }))
            .await
            .unwrap();
        handle_block_headers(&chain, &config, &mut server).await.unwrap();

        assert!(posted.try_recv().is_err());
    }
}
