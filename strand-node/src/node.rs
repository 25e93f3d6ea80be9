//! Node orchestrator.
//!
//! Owns the local chain, serves it over TCP and optionally catches up from
//! the configured peers at startup.

use std::sync::Arc;

use strand_core::BlockHeader;
use strand_diffusion::{
    announce_block_header, get_blocks, request_tip, serve_tcp, ChainOracle, Listeners,
    MemoryChain, PeerEnqueuer, PeerId, PeerSelector, TcpEnqueuer,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::shutdown::{shutdown_channel, trigger_on_signal, ShutdownGuard, ShutdownTx};

/// The main node structure.
pub struct Node {
    /// Node configuration.
    config: NodeConfig,

    /// Local chain, also the oracle behind the listeners.
    chain: Arc<MemoryChain>,

    /// Inbound conversation dispatcher.
    listeners: Listeners,

    /// Outbound conversations to configured peers.
    enqueuer: Arc<dyn PeerEnqueuer>,

    /// Shutdown signal sender.
    shutdown_tx: ShutdownTx,
}

impl Node {
    /// Create a new node with the given configuration.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let blocks = MemoryChain::generate(config.chain_length, config.slots_per_epoch);
        let chain = Arc::new(
            MemoryChain::from_blocks(blocks)?
                .with_security(config.security.clone())
                .with_header_limit(config.diffusion.max_blocks_per_request),
        );
        chain.set_recovery(config.recovery);

        match chain.tip() {
            Ok(tip) => info!(
                height = tip.height(),
                tip = %tip.hash().short(),
                "Chain initialized"
            ),
            Err(e) => info!(reason = %e, "Chain initialized empty"),
        }

        let listeners = Listeners::new(chain.clone(), config.diffusion.clone());
        let enqueuer: Arc<dyn PeerEnqueuer> =
            Arc::new(TcpEnqueuer::new(config.peers.clone(), &config.diffusion));
        let shutdown_tx = shutdown_channel();

        Ok(Self {
            config,
            chain,
            listeners,
            enqueuer,
            shutdown_tx,
        })
    }

    /// The local chain.
    pub fn chain(&self) -> &Arc<MemoryChain> {
        &self.chain
    }

    /// Sender that stops [`Node::serve`] when signalled.
    pub fn shutdown_handle(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Run the node until SIGINT or SIGTERM.
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(
            recovery = self.config.recovery,
            catch_up = self.config.catch_up,
            "Starting node"
        );

        let signals = trigger_on_signal(self.shutdown_tx.clone());
        let served = self.serve(listener).await;
        signals.abort();
        served?;
        info!("Node shutdown complete");
        Ok(())
    }

    /// Serve inbound conversations on `listener` until shutdown, catching up
    /// first when configured to.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut guard = ShutdownGuard::new(&self.shutdown_tx);

        let server = tokio::spawn(serve_tcp(
            listener,
            self.listeners.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let watcher = tokio::spawn(watch_announcements(
            self.chain.clone(),
            self.chain.subscribe(),
            ShutdownGuard::new(&self.shutdown_tx),
        ));

        if self.config.catch_up && !guard.is_shutdown() {
            match self.catch_up().await {
                Ok(applied) => info!(applied, "Catch-up finished"),
                Err(e) => warn!(error = %e, "Catch-up failed"),
            }
        }

        guard.wait().await;
        info!("Shutting down node...");

        server.await??;
        let _ = watcher.await;
        Ok(())
    }

    /// Fetch blocks from the peer with the highest tip until the local tip
    /// reaches it, then announce the new tip. Returns the number of blocks
    /// applied.
    ///
    /// The local chain reports recovery mode while blocks are fetched.
    pub async fn catch_up(&self) -> anyhow::Result<usize> {
        let (peer, target) = match self.best_peer_tip().await {
            Some(best) => best,
            None => {
                info!("No peer reported a tip");
                return Ok(0);
            }
        };

        let local = self.chain.tip()?;
        if target.height <= local.height() {
            info!(
                %peer,
                local = local.height(),
                remote = target.height,
                "Already up to date"
            );
            return Ok(0);
        }

        info!(%peer, from = local.height(), to = target.height, "Catching up");
        self.chain.set_recovery(true);
        let result = self.fetch_until(peer, &target).await;
        self.chain.set_recovery(self.config.recovery);
        let applied = result?;

        self.announce_tip().await?;
        Ok(applied)
    }

    /// Ask every peer for its tip and keep the highest.
    async fn best_peer_tip(&self) -> Option<(PeerId, BlockHeader)> {
        let pending = request_tip(
            &self.enqueuer,
            &self.config.diffusion,
            &PeerSelector::All,
            |header: BlockHeader, _peer: PeerId| async move { header },
        );

        let mut best: Option<(PeerId, BlockHeader)> = None;
        for (peer, handle) in pending {
            match handle.wait().await {
                Ok(header) => {
                    debug!(%peer, height = header.height, "Peer tip");
                    if best.as_ref().map_or(true, |(_, b)| header.height > b.height) {
                        best = Some((peer, header));
                    }
                }
                Err(e) => warn!(%peer, error = %e, "Tip request failed"),
            }
        }
        best
    }

    /// Repeat range downloads from `peer` until the local tip reaches `target`.
    async fn fetch_until(&self, peer: PeerId, target: &BlockHeader) -> anyhow::Result<usize> {
        let mut applied = 0;

        loop {
            let tip = self.chain.tip()?;
            if tip.height() >= target.height {
                return Ok(applied);
            }

            let blocks = get_blocks(
                self.chain.as_ref(),
                &self.enqueuer,
                &self.config.diffusion,
                peer,
                target,
                &[tip.hash()],
            )
            .await?;

            let count = self.chain.apply_blocks(blocks.into_oldest_first())?;
            applied += count;
            info!(%peer, count, height = self.chain.tip()?.height(), "Applied blocks");
        }
    }

    /// Announce the local tip header to every peer.
    async fn announce_tip(&self) -> anyhow::Result<()> {
        let header = self.chain.tip()?.header;
        let oracle: Arc<dyn ChainOracle> = self.chain.clone();

        let pending = announce_block_header(
            &oracle,
            &self.enqueuer,
            &self.config.diffusion,
            &PeerSelector::All,
            header,
        );
        for (peer, handle) in pending {
            if let Err(e) = handle.wait().await {
                warn!(%peer, error = %e, "Announcement failed");
            }
        }
        Ok(())
    }
}

/// Log headers announced by peers until shutdown.
async fn watch_announcements(
    chain: Arc<MemoryChain>,
    mut posted: mpsc::UnboundedReceiver<(BlockHeader, PeerId)>,
    mut guard: ShutdownGuard,
) {
    loop {
        tokio::select! {
            _ = guard.wait() => return,
            next = posted.recv() => {
                let (header, peer) = match next {
                    Some(posted) => posted,
                    None => return,
                };
                let local = chain.tip().map(|tip| tip.height()).unwrap_or(0);
                info!(
                    %peer,
                    height = header.height,
                    hash = %header.hash().short(),
                    ahead = header.height > local,
                    "Peer announced header"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use strand_diffusion::{AttackTarget, AttackType, SecurityParams};
    use tokio::time::timeout;

    fn node_config(chain_length: usize, peers: Vec<(PeerId, SocketAddr)>) -> NodeConfig {
        NodeConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            peers,
            chain_length,
            slots_per_epoch: 5,
            ..NodeConfig::default()
        }
    }

    /// Start a node serving on an ephemeral port.
    async fn start(node: Arc<Node>) -> (SocketAddr, tokio::task::JoinHandle<anyhow::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move { node.serve(listener).await });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_catch_up_from_longer_peer() {
        // Ranges capped at 12 blocks force several rounds.
        let mut config = node_config(40, Vec::new());
        config.diffusion = config.diffusion.with_max_blocks_per_request(12);
        let serving = Arc::new(Node::new(config).unwrap());
        let (addr, handle) = start(serving.clone()).await;

        let lagging = Node::new(node_config(8, vec![(PeerId(1), addr)])).unwrap();

        let applied = timeout(Duration::from_secs(10), lagging.catch_up())
            .await
            .expect("catch-up timed out")
            .unwrap();

        assert_eq!(applied, 32);
        assert_eq!(lagging.chain().tip().unwrap(), serving.chain().tip().unwrap());
        assert!(!lagging.chain().recovery_in_progress());

        serving.shutdown_handle().send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_catch_up_when_ahead_applies_nothing() {
        let serving = Arc::new(Node::new(node_config(10, Vec::new())).unwrap());
        let (addr, handle) = start(serving.clone()).await;

        let ahead = Node::new(node_config(15, vec![(PeerId(1), addr)])).unwrap();
        let applied = ahead.catch_up().await.unwrap();

        assert_eq!(applied, 0);
        assert_eq!(ahead.chain().len(), 15);

        serving.shutdown_handle().send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_attack_policy_reaches_chain() {
        let target: SocketAddr = "10.0.0.1:3000".parse().unwrap();
        let mut config = node_config(3, Vec::new());
        config.security = SecurityParams {
            attack_types: vec![AttackType::NoBlocks],
            attack_targets: vec![AttackTarget::Network(target)],
        };

        let node = Node::new(config).unwrap();
        assert!(node.chain().security_params().targets_no_blocks(&target));
    }

    #[tokio::test]
    async fn test_catch_up_without_peers() {
        let node = Node::new(node_config(5, Vec::new())).unwrap();
        assert_eq!(node.catch_up().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recovering_peer_is_skipped() {
        let mut config = node_config(20, Vec::new());
        config.recovery = true;
        let serving = Arc::new(Node::new(config).unwrap());
        let (addr, handle) = start(serving.clone()).await;

        // A recovering peer refuses even tip requests.
        let lagging = Node::new(node_config(4, vec![(PeerId(1), addr)])).unwrap();
        assert_eq!(lagging.catch_up().await.unwrap(), 0);
        assert_eq!(lagging.chain().len(), 4);
        assert!(!lagging.chain().recovery_in_progress());

        serving.shutdown_handle().send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
