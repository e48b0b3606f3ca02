//! Test harness wiring nodes, the simulated chain and the in-process router

use std::net::SocketAddr;
use std::sync::Arc;

use volt_crypto::{public_key_to_address, PrivateKey};
use volt_ledger::SimLedger;
use volt_net::InProcNet;
use volt_node::{LightningNode, NodeConfig};
use volt_primitives::{Address, Amount};

use crate::E2eResult;

/// Initial balance for funded test accounts
pub const FUNDED_BALANCE: Amount = 1_000;

/// Appeal period every harness node deploys with, in blocks
pub const TEST_APPEAL_PERIOD: u64 = 20;

/// One node plus the identity it runs under
pub struct TestParty {
    node: Arc<LightningNode>,
}

impl TestParty {
    /// The node under test
    pub fn node(&self) -> &LightningNode {
        &self.node
    }

    /// The node's ledger account
    pub fn address(&self) -> Address {
        self.node.address()
    }

    /// Where the node receives peer messages
    pub fn location(&self) -> SocketAddr {
        self.node.location()
    }
}

/// Harness owning the simulated chain and the message router
pub struct TestHarness {
    chain: SimLedger,
    net: Arc<InProcNet>,
    next_port: u16,
}

impl TestHarness {
    /// Fresh chain at block 0, empty router
    pub fn new() -> Self {
        Self {
            chain: SimLedger::new(),
            net: Arc::new(InProcNet::new()),
            next_port: 9100,
        }
    }

    /// Spawn a funded node and register it with the router
    pub fn create_node(&mut self) -> TestParty {
        let key = PrivateKey::random(&mut rand::thread_rng());
        let address = public_key_to_address(key.verifying_key());
        self.chain.fund_account(address, FUNDED_BALANCE);

        let location: SocketAddr = format!("127.0.0.1:{}", self.next_port)
            .parse()
            .expect("valid loopback address");
        self.next_port += 1;

        let mut config = NodeConfig::new(location);
        config.appeal_period = TEST_APPEAL_PERIOD;

        let node = Arc::new(LightningNode::new(
            key,
            config,
            Arc::new(self.chain.client(address)),
            self.net.clone(),
        ));
        self.net.register(location, node.clone());
        TestParty { node }
    }

    /// Open a channel from `funder` to `peer`
    pub fn open_channel(
        &self,
        funder: &TestParty,
        peer: &TestParty,
        amount: Amount,
    ) -> E2eResult<Address> {
        Ok(funder
            .node()
            .establish_channel(peer.address(), peer.location(), amount)?)
    }

    /// The simulated chain
    pub fn chain(&self) -> &SimLedger {
        &self.chain
    }

    /// An account's on-chain balance
    pub fn balance(&self, address: Address) -> Amount {
        self.chain.account_balance(address)
    }

    /// Advance the chain past any appeal window opened so far
    pub fn advance_past_appeal_window(&self) {
        self.chain.advance_blocks(TEST_APPEAL_PERIOD);
    }

    /// Take a node off the router, simulating an unreachable peer
    pub fn disconnect(&self, party: &TestParty) {
        self.net.unregister(&party.location());
    }

    /// Put a node back on the router
    pub fn reconnect(&self, party: &TestParty) {
        self.net.register(party.location(), party.node.clone());
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
