//! Diffusion configuration.

use std::net::SocketAddr;

/// Network magic bytes identifying the Strand protocol.
pub const NETWORK_MAGIC: [u8; 4] = [0x53, 0x54, 0x52, 0x44]; // "STRD"

/// Maximum framed message size in bytes (2 MB).
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// Default receive limit for header responses.
pub const DEFAULT_HEADERS_LIMIT: usize = MAX_MESSAGE_SIZE;

/// Default receive limit for a single block.
pub const DEFAULT_BLOCK_LIMIT: usize = MAX_MESSAGE_SIZE;

/// Default receive limit for requests and announcements.
pub const DEFAULT_REQUEST_LIMIT: usize = 64 * 1024;

/// Default cap on the number of blocks served for one `GetBlocks` range.
pub const DEFAULT_MAX_BLOCKS_PER_REQUEST: usize = 2000;

/// Per-purpose receive limits, in serialized bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    /// Limit for `Headers` / `NoHeaders` responses.
    pub headers: usize,
    /// Limit for each `Block` / `NoBlock` message.
    pub block: usize,
    /// Limit for `GetHeaders`, `GetBlocks` and `AnnounceBlockHeader`.
    pub request: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            headers: DEFAULT_HEADERS_LIMIT,
            block: DEFAULT_BLOCK_LIMIT,
            request: DEFAULT_REQUEST_LIMIT,
        }
    }
}

/// Misbehaviour a node can be told to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackType {
    /// Announce headers but never serve the blocks behind them.
    NoBlocks,
}

/// Peer an attack simulation is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackTarget {
    /// Peer reached at this network address.
    Network(SocketAddr),
}

/// Attack-simulation policy. Empty in normal operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityParams {
    /// Attacks this node simulates.
    pub attack_types: Vec<AttackType>,
    /// Peers the attacks are aimed at.
    pub attack_targets: Vec<AttackTarget>,
}

impl SecurityParams {
    /// Whether a `NoBlocks` attack is configured against `addr`.
    pub fn targets_no_blocks(&self, addr: &SocketAddr) -> bool {
        self.attack_types.contains(&AttackType::NoBlocks)
            && self
                .attack_targets
                .iter()
                .any(|target| matches!(target, AttackTarget::Network(a) if a == addr))
    }
}

/// Configuration for the diffusion layer.
#[derive(Debug, Clone)]
pub struct DiffusionConfig {
    /// Magic bytes prefixed to every frame.
    pub network_magic: [u8; 4],

    /// Largest frame accepted or produced by the TCP codec.
    pub max_message_size: usize,

    /// Per-purpose receive limits.
    pub limits: MessageLimits,

    /// Cap on blocks served for one `GetBlocks` range.
    pub max_blocks_per_request: usize,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            network_magic: NETWORK_MAGIC,
            max_message_size: MAX_MESSAGE_SIZE,
            limits: MessageLimits::default(),
            max_blocks_per_request: DEFAULT_MAX_BLOCKS_PER_REQUEST,
        }
    }
}

impl DiffusionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the network magic.
    pub fn with_network_magic(mut self, magic: [u8; 4]) -> Self {
        self.network_magic = magic;
        self
    }

    /// Set the maximum frame size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the per-purpose receive limits.
    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the cap on blocks served per range.
    pub fn with_max_blocks_per_request(mut self, count: usize) -> Self {
        self.max_blocks_per_request = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiffusionConfig::default();
        assert_eq!(config.network_magic, NETWORK_MAGIC);
        assert_eq!(config.max_message_size, MAX_MESSAGE_SIZE);
        assert_eq!(config.max_blocks_per_request, DEFAULT_MAX_BLOCKS_PER_REQUEST);
    }

    #[test]
    fn test_config_builder() {
        let config = DiffusionConfig::new()
            .with_network_magic(*b"TEST")
            .with_max_message_size(4096)
            .with_max_blocks_per_request(16);

        assert_eq!(config.network_magic, *b"TEST");
        assert_eq!(config.max_message_size, 4096);
        assert_eq!(config.max_blocks_per_request, 16);
    }

    #[test]
    fn test_no_blocks_targeting() {
        let target: SocketAddr = "10.0.0.1:3000".parse().unwrap();
        let other: SocketAddr = "10.0.0.2:3000".parse().unwrap();

        let mut params = SecurityParams {
            attack_types: vec![AttackType::NoBlocks],
            attack_targets: vec![AttackTarget::Network(target)],
        };
        assert!(params.targets_no_blocks(&target));
        assert!(!params.targets_no_blocks(&other));

        params.attack_types.clear();
        assert!(!params.targets_no_blocks(&target));
    }
}
