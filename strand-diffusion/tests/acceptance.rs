//! Acceptance tests for the diffusion layer.
//!
//! These tests drive client operations against real listeners:
//! 1. Catch-up - A lagging node fetches the missing blocks from a peer
//! 2. Fast path - Asking from the tip itself fetches exactly the tip block
//! 3. Recovery mode - A recovering peer refuses headers and the download fails
//! 4. Capped ranges - Repeated downloads catch up past the server's cap
//! 5. Streaming - Blocks stream oldest first into a fold
//! 6. Tips - Tip requests fan out, boundary tips report their main parent
//! 7. Announcements - Announced headers are posted to the peer's chain
//! 8. TCP - The same operations work over framed TCP connections

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use strand_core::{Block, BlockHeader, HeaderHash};
use strand_diffusion::{
    announce_block_header, get_blocks, request_tip, serve_tcp, stream_blocks, ChainOracle,
    DiffusionConfig, GetBlocksError, Listeners, MemoryChain, MemoryNetwork, PeerEnqueuer, PeerId,
    PeerSelector, TcpEnqueuer,
};

/// Upper bound for any single scenario.
const SCENARIO_TIMEOUT: Duration = Duration::from_secs(10);

/// Slots per epoch for generated chains.
const EPOCH_SLOTS: u64 = 8;

/// A node serving `blocks` with default settings.
fn serving_node(blocks: &[Block]) -> (Arc<MemoryChain>, Listeners) {
    let chain = Arc::new(MemoryChain::from_blocks(blocks.to_vec()).unwrap());
    let listeners = Listeners::new(chain.clone(), DiffusionConfig::default());
    (chain, listeners)
}

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// In-memory network seen from `PeerId(0)`.
fn memory_network(peers: Vec<(PeerId, Listeners)>) -> Arc<dyn PeerEnqueuer> {
    let network = MemoryNetwork::new(PeerId(0));
    for (i, (peer, listeners)) in peers.into_iter().enumerate() {
        network.add_listeners(peer, addr(4000 + i as u16), listeners);
    }
    Arc::new(network)
}

/// Fetch from `peer` until the local tip matches `target`.
async fn catch_up(
    local: &MemoryChain,
    enqueuer: &Arc<dyn PeerEnqueuer>,
    peer: PeerId,
    target: &BlockHeader,
) -> Result<usize, GetBlocksError> {
    let config = DiffusionConfig::default();
    let mut rounds = 0;

    while local.tip().unwrap().hash() != target.hash() {
        let checkpoints = [local.tip().unwrap().hash()];
        let blocks = get_blocks(local, enqueuer, &config, peer, target, &checkpoints).await?;
        local.apply_blocks(blocks.into_oldest_first()).unwrap();
        rounds += 1;
    }

    Ok(rounds)
}

// ============================================================================
// Test 1: Catch-up - Lagging node downloads the missing range
// ============================================================================

#[tokio::test]
async fn test_catch_up_from_peer() {
    let blocks = MemoryChain::generate(30, EPOCH_SLOTS);
    let (_remote, listeners) = serving_node(&blocks);
    let local = MemoryChain::from_blocks(blocks[..12].to_vec()).unwrap();
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let tip = blocks[29].header.clone();
    let fetched = timeout(
        SCENARIO_TIMEOUT,
        get_blocks(
            &local,
            &enqueuer,
            &DiffusionConfig::default(),
            PeerId(1),
            &tip,
            &[blocks[11].hash()],
        ),
    )
    .await
    .expect("catch-up timed out")
    .unwrap();

    // Exactly the missing blocks, newest first.
    assert_eq!(fetched.len(), 18);
    assert_eq!(fetched.newest(), &blocks[29]);
    assert_eq!(fetched.oldest(), &blocks[12]);
    assert!(fetched.iter().all(Block::verify_body_root));

    local.apply_blocks(fetched.into_oldest_first()).unwrap();
    assert_eq!(local.tip().unwrap(), blocks[29]);
}

// ============================================================================
// Test 2: Fast path - Tip as the only checkpoint
// ============================================================================

#[tokio::test]
async fn test_fast_path_returns_tip_block() {
    let blocks = MemoryChain::generate(10, EPOCH_SLOTS);
    let (_remote, listeners) = serving_node(&blocks);
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let tip = &blocks[9];
    let fetched = timeout(
        SCENARIO_TIMEOUT,
        get_blocks(
            &MemoryChain::new(),
            &enqueuer,
            &DiffusionConfig::default(),
            PeerId(1),
            &tip.header,
            &[tip.hash()],
        ),
    )
    .await
    .expect("fast path timed out")
    .unwrap();

    assert_eq!(fetched.into_vec(), vec![tip.clone()]);
}

// ============================================================================
// Test 3: Recovery mode - Headers refused with the recovery reason
// ============================================================================

#[tokio::test]
async fn test_recovering_peer_refuses_headers() {
    let blocks = MemoryChain::generate(10, EPOCH_SLOTS);
    let (remote, listeners) = serving_node(&blocks);
    remote.set_recovery(true);
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let result = timeout(
        SCENARIO_TIMEOUT,
        get_blocks(
            &MemoryChain::new(),
            &enqueuer,
            &DiffusionConfig::default(),
            PeerId(1),
            &blocks[9].header,
            &[blocks[2].hash()],
        ),
    )
    .await
    .expect("recovery scenario timed out");

    match result {
        Err(GetBlocksError::NoHeaders(reason)) => assert!(reason.contains("recovery mode")),
        other => panic!("expected NoHeaders, got {:?}", other),
    }
}

// ============================================================================
// Test 4: Capped ranges - Several rounds against a capped server
// ============================================================================

#[tokio::test]
async fn test_catch_up_past_header_cap() {
    let blocks = MemoryChain::generate(40, EPOCH_SLOTS);
    let remote = Arc::new(
        MemoryChain::from_blocks(blocks.clone())
            .unwrap()
            .with_header_limit(10),
    );
    let listeners = Listeners::new(remote, DiffusionConfig::default());
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);
    let local = MemoryChain::from_blocks(blocks[..5].to_vec()).unwrap();

    let rounds = timeout(
        SCENARIO_TIMEOUT,
        catch_up(&local, &enqueuer, PeerId(1), &blocks[39].header),
    )
    .await
    .expect("capped catch-up timed out")
    .unwrap();

    // 35 missing blocks, at most 10 per round.
    assert_eq!(rounds, 4);
    assert_eq!(local.len(), 40);
    assert_eq!(local.tip().unwrap(), blocks[39]);
}

// ============================================================================
// Test 5: Streaming - Fold arrives oldest first
// ============================================================================

#[tokio::test]
async fn test_stream_blocks_folds_in_order() {
    let blocks = MemoryChain::generate(20, EPOCH_SLOTS);
    let (_remote, listeners) = serving_node(&blocks);
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let heights = timeout(
        SCENARIO_TIMEOUT,
        stream_blocks(
            &enqueuer,
            &DiffusionConfig::default(),
            PeerId(1),
            &blocks[19].header,
            &[blocks[14].hash()],
            |block: Block| vec![block.height()],
        ),
    )
    .await
    .expect("stream timed out")
    .unwrap();

    assert_eq!(heights, vec![15, 16, 17, 18, 19]);
}

#[tokio::test]
async fn test_stream_blocks_refused_range_is_empty_fold() {
    let blocks = MemoryChain::generate(6, EPOCH_SLOTS);
    let (_remote, listeners) = serving_node(&blocks);
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let count = timeout(
        SCENARIO_TIMEOUT,
        stream_blocks(
            &enqueuer,
            &DiffusionConfig::default(),
            PeerId(1),
            &blocks[5].header,
            &[HeaderHash([0x99; 32])],
            |_block: Block| 1u64,
        ),
    )
    .await
    .expect("stream timed out")
    .unwrap();

    assert_eq!(count, 0);
}

// ============================================================================
// Test 6: Tips - Fan-out to several peers
// ============================================================================

#[tokio::test]
async fn test_request_tip_from_all_peers() {
    let blocks = MemoryChain::generate(20, EPOCH_SLOTS);
    // Height 16 is an epoch boundary, so this peer reports height 15.
    let (_a, main_tip) = serving_node(&blocks[..20]);
    let (_b, boundary_tip) = serving_node(&blocks[..17]);
    let enqueuer = memory_network(vec![(PeerId(1), main_tip), (PeerId(2), boundary_tip)]);

    let pending = request_tip(
        &enqueuer,
        &DiffusionConfig::default(),
        &PeerSelector::All,
        |header: BlockHeader, _peer: PeerId| async move { header },
    );

    let mut tips = HashMap::new();
    for (peer, handle) in pending {
        let header = timeout(SCENARIO_TIMEOUT, handle.wait())
            .await
            .expect("tip request timed out")
            .unwrap();
        tips.insert(peer, header);
    }

    assert_eq!(tips[&PeerId(1)], blocks[19].header);
    assert_eq!(tips[&PeerId(2)], blocks[15].header);
}

// ============================================================================
// Test 7: Announcements - Header reaches the peer's chain logic
// ============================================================================

#[tokio::test]
async fn test_announced_header_is_posted() {
    let blocks = MemoryChain::generate(12, EPOCH_SLOTS);
    let local: Arc<dyn ChainOracle> = Arc::new(MemoryChain::from_blocks(blocks.clone()).unwrap());
    let (remote, listeners) = serving_node(&blocks[..11]);
    let mut posted = remote.subscribe();
    let enqueuer = memory_network(vec![(PeerId(1), listeners)]);

    let pending = announce_block_header(
        &local,
        &enqueuer,
        &DiffusionConfig::default(),
        &PeerSelector::All,
        blocks[11].header.clone(),
    );
    for (_, handle) in pending {
        timeout(SCENARIO_TIMEOUT, handle.wait())
            .await
            .expect("announcement timed out")
            .unwrap();
    }

    let (header, from) = timeout(SCENARIO_TIMEOUT, posted.recv())
        .await
        .expect("no header posted")
        .unwrap();
    assert_eq!(header, blocks[11].header);
    assert_eq!(from, PeerId(0));
}

// ============================================================================
// Test 8: TCP - Catch-up and streaming over framed connections
// ============================================================================

#[tokio::test]
async fn test_tcp_catch_up_and_stream() {
    let blocks = MemoryChain::generate(25, EPOCH_SLOTS);
    let (_remote, listeners) = serving_node(&blocks);
    let config = DiffusionConfig::default();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = tokio::spawn(serve_tcp(listener, listeners, shutdown_rx));

    let enqueuer: Arc<dyn PeerEnqueuer> =
        Arc::new(TcpEnqueuer::new(vec![(PeerId(1), server_addr)], &config));
    let local = MemoryChain::from_blocks(blocks[..3].to_vec()).unwrap();

    let rounds = timeout(
        SCENARIO_TIMEOUT,
        catch_up(&local, &enqueuer, PeerId(1), &blocks[24].header),
    )
    .await
    .expect("TCP catch-up timed out")
    .unwrap();
    assert_eq!(rounds, 1);
    assert_eq!(local.tip().unwrap(), blocks[24]);

    let count = timeout(
        SCENARIO_TIMEOUT,
        stream_blocks(
            &enqueuer,
            &config,
            PeerId(1),
            &blocks[24].header,
            &[blocks[20].hash()],
            |_block: Block| 1usize,
        ),
    )
    .await
    .expect("TCP stream timed out")
    .unwrap();
    assert_eq!(count, 4);

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
