//! Ledger client capability

use thiserror::Error;
use volt_primitives::{Address, Amount, BlockNumber, Serial};
use volt_types::ChannelStateMsg;

/// On-ledger lifecycle of a channel contract
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Deployed and accepting off-chain updates
    Open,
    /// Close submitted, appeal window still running
    Closing,
    /// Appeal window elapsed, balances final
    Closed,
}

/// The single "ledger rejected operation" error kind.
///
/// Reverted transactions, unknown contracts and transport faults all
/// surface as this; callers retry by re-invoking the node operation.
#[derive(Debug, Error)]
#[error("ledger rejected operation: {0}")]
pub struct LedgerError(String);

impl LedgerError {
    /// Create a new error with a human-readable reason
    pub fn new(reason: impl Into<String>) -> Self {
        LedgerError(reason.into())
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Access to the ledger and the channel contracts deployed on it.
///
/// One client instance is bound to one submitting account; transactions
/// (`deploy_channel`, `submit_*`) are sent from that account. Queries may
/// block on network or consensus latency, so callers must not invoke them
/// while holding per-channel guards.
pub trait LedgerClient: Send + Sync {
    /// Deploy and fund a channel contract between the two parties.
    ///
    /// The funding amount is taken from `party1`'s account. Returns the
    /// address of the deployed contract.
    fn deploy_channel(
        &self,
        party1: Address,
        party2: Address,
        appeal_period: u64,
        funding: Amount,
    ) -> LedgerResult<Address>;

    /// Current block height
    fn block_number(&self) -> LedgerResult<BlockNumber>;

    /// Spendable balance of an account
    fn account_balance(&self, account: Address) -> LedgerResult<Amount>;

    /// Lifecycle status of a channel contract.
    ///
    /// Reports [`ChannelStatus::Closed`] once a submitted close has
    /// outlived its appeal window.
    fn status(&self, channel: Address) -> LedgerResult<ChannelStatus>;

    /// The two owners of a channel contract, in contract order
    fn parties(&self, channel: Address) -> LedgerResult<(Address, Address)>;

    /// Appeal period the contract was deployed with, in blocks
    fn appeal_period(&self, channel: Address) -> LedgerResult<u64>;

    /// Total amount locked at deployment
    fn funding(&self, channel: Address) -> LedgerResult<Amount>;

    /// Serial number of the closing state currently recorded on-chain
    fn recorded_closing_serial(&self, channel: Address) -> LedgerResult<Serial>;

    /// Block at which the appeal window ends
    fn appeal_deadline(&self, channel: Address) -> LedgerResult<BlockNumber>;

    /// A party's share of the channel as recorded on-chain
    fn channel_balance(&self, channel: Address, party: Address) -> LedgerResult<Amount>;

    /// Close the channel with the given state, starting the appeal window
    fn submit_close(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()>;

    /// Override a recorded closing state with a later one
    fn submit_appeal(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()>;

    /// Pay out a party's recorded share after the appeal window
    fn submit_withdraw(&self, channel: Address, party: Address) -> LedgerResult<()>;
}
