//! Strand node: serves the diffusion protocol over TCP from a local chain
//! and catches up from configured peers.

pub mod cli;
pub mod config;
pub mod node;
pub mod shutdown;

pub use cli::Cli;
pub use config::NodeConfig;
pub use node::Node;
