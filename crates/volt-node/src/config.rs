//! Node configuration

use std::net::SocketAddr;

/// Appeal period requested when this node funds a channel, in blocks
pub const DEFAULT_APPEAL_PERIOD: u64 = 20;

/// Smallest appeal period this node accepts on an incoming channel.
///
/// A counterparty deploying with a shorter window could close with a
/// stale state and leave no time to dispute it.
pub const DEFAULT_MIN_APPEAL_PERIOD: u64 = 5;

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Location advertised to peers and used for inbound delivery
    pub location: SocketAddr,
    /// Appeal period requested when this node funds a channel
    pub appeal_period: u64,
    /// Smallest appeal period accepted on an incoming channel
    pub min_appeal_period: u64,
}

impl NodeConfig {
    /// Configuration with default periods at the given location
    pub fn new(location: SocketAddr) -> Self {
        Self {
            location,
            appeal_period: DEFAULT_APPEAL_PERIOD,
            min_appeal_period: DEFAULT_MIN_APPEAL_PERIOD,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:9735".parse().expect("valid default address"))
    }
}
