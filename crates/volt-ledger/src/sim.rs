//! Deterministic in-memory ledger simulation.
//!
//! Implements the channel-contract rules the node is written against:
//! funds escrowed at deployment, close recorded with an appeal window,
//! appeals overriding stale closing states, and one withdrawal per party
//! once the window has elapsed. Blocks only advance when a test calls
//! [`SimLedger::advance_blocks`], so timing-sensitive paths are fully
//! reproducible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use volt_crypto::keccak256;
use volt_primitives::{Address, Amount, BlockNumber, Serial};
use volt_types::{ChannelStateMsg, Party};

use crate::{ChannelStatus, LedgerClient, LedgerError, LedgerResult};

/// One deployed channel contract
struct ChannelContract {
    party1: Address,
    party2: Address,
    funding: Amount,
    appeal_period: u64,
    closed_at: Option<BlockNumber>,
    deadline: BlockNumber,
    closing_serial: Serial,
    closing_balance1: Amount,
    closing_balance2: Amount,
    withdrawn1: bool,
    withdrawn2: bool,
}

impl ChannelContract {
    fn party_of(&self, account: Address) -> Option<Party> {
        if account == self.party1 {
            Some(Party::One)
        } else if account == self.party2 {
            Some(Party::Two)
        } else {
            None
        }
    }

    fn status_at(&self, block: BlockNumber) -> ChannelStatus {
        match self.closed_at {
            None => ChannelStatus::Open,
            Some(_) if block < self.deadline => ChannelStatus::Closing,
            Some(_) => ChannelStatus::Closed,
        }
    }
}

#[derive(Default)]
struct ChainState {
    accounts: HashMap<Address, Amount>,
    contracts: HashMap<Address, ChannelContract>,
    deployed: u64,
}

/// Shared in-memory chain.
///
/// Clones share the same state; hand each node a bound client via
/// [`SimLedger::client`].
#[derive(Clone, Default)]
pub struct SimLedger {
    block: Arc<AtomicU64>,
    state: Arc<Mutex<ChainState>>,
}

impl SimLedger {
    /// Create an empty chain at block 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account (test setup)
    pub fn fund_account(&self, account: Address, amount: Amount) {
        let mut state = self.state.lock();
        *state.accounts.entry(account).or_insert(0) += amount;
    }

    /// Advance the chain by `n` blocks
    pub fn advance_blocks(&self, n: u64) {
        self.block.fetch_add(n, Ordering::SeqCst);
    }

    /// Current block height
    pub fn block_number(&self) -> BlockNumber {
        self.block.load(Ordering::SeqCst)
    }

    /// Spendable balance of an account
    pub fn account_balance(&self, account: Address) -> Amount {
        self.state.lock().accounts.get(&account).copied().unwrap_or(0)
    }

    /// Client bound to a submitting account
    pub fn client(&self, account: Address) -> SimLedgerClient {
        SimLedgerClient {
            chain: self.clone(),
            account,
        }
    }

    fn deploy(
        &self,
        party1: Address,
        party2: Address,
        appeal_period: u64,
        funding: Amount,
    ) -> LedgerResult<Address> {
        if party1 == party2 {
            return Err(LedgerError::new("channel parties must differ"));
        }
        if funding == 0 {
            return Err(LedgerError::new("funding must be positive"));
        }

        let mut state = self.state.lock();
        let balance = state.accounts.get(&party1).copied().unwrap_or(0);
        if balance < funding {
            return Err(LedgerError::new("insufficient funds for channel deployment"));
        }

        state.deployed += 1;
        let channel = derive_channel_address(&party1, &party2, state.deployed);
        *state.accounts.get_mut(&party1).expect("funder exists") -= funding;
        state.contracts.insert(
            channel,
            ChannelContract {
                party1,
                party2,
                funding,
                appeal_period,
                closed_at: None,
                deadline: 0,
                closing_serial: 0,
                closing_balance1: funding,
                closing_balance2: 0,
                withdrawn1: false,
                withdrawn2: false,
            },
        );

        info!("deployed channel {} with funding {}", channel, funding);
        Ok(channel)
    }

    fn close(
        &self,
        submitter: Address,
        channel: Address,
        state_msg: &ChannelStateMsg,
    ) -> LedgerResult<()> {
        let block = self.block_number();
        let mut state = self.state.lock();
        let contract = contract_mut(&mut state.contracts, &channel)?;
        let submitter = contract
            .party_of(submitter)
            .ok_or_else(|| LedgerError::new("submitter is not a channel party"))?;
        if contract.status_at(block) != ChannelStatus::Open {
            return Err(LedgerError::new("channel is not open"));
        }
        check_state(contract, channel, state_msg)?;
        check_signature(contract, submitter, state_msg)?;

        contract.closed_at = Some(block);
        contract.deadline = block + contract.appeal_period;
        contract.closing_serial = state_msg.serial;
        contract.closing_balance1 = state_msg.balance1;
        contract.closing_balance2 = state_msg.balance2;

        info!(
            "channel {} closed at serial {}, appeal window ends at block {}",
            channel, state_msg.serial, contract.deadline
        );
        Ok(())
    }

    fn appeal(
        &self,
        submitter: Address,
        channel: Address,
        state_msg: &ChannelStateMsg,
    ) -> LedgerResult<()> {
        let block = self.block_number();
        let mut state = self.state.lock();
        let contract = contract_mut(&mut state.contracts, &channel)?;
        let submitter = contract
            .party_of(submitter)
            .ok_or_else(|| LedgerError::new("submitter is not a channel party"))?;
        match contract.status_at(block) {
            ChannelStatus::Open => return Err(LedgerError::new("channel is not closing")),
            ChannelStatus::Closed => return Err(LedgerError::new("appeal window has elapsed")),
            ChannelStatus::Closing => {}
        }
        check_state(contract, channel, state_msg)?;
        if state_msg.serial <= contract.closing_serial {
            return Err(LedgerError::new("appeal state is not newer than the recorded one"));
        }
        check_signature(contract, submitter, state_msg)?;

        debug!(
            "channel {} appeal: serial {} replaces {}",
            channel, state_msg.serial, contract.closing_serial
        );
        contract.closing_serial = state_msg.serial;
        contract.closing_balance1 = state_msg.balance1;
        contract.closing_balance2 = state_msg.balance2;
        Ok(())
    }

    fn withdraw(&self, submitter: Address, channel: Address) -> LedgerResult<()> {
        let block = self.block_number();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let contract = contract_mut(&mut state.contracts, &channel)?;
        let party = contract
            .party_of(submitter)
            .ok_or_else(|| LedgerError::new("submitter is not a channel party"))?;
        if contract.status_at(block) != ChannelStatus::Closed {
            return Err(LedgerError::new("appeal window has not elapsed"));
        }

        let (amount, withdrawn) = match party {
            Party::One => (contract.closing_balance1, &mut contract.withdrawn1),
            Party::Two => (contract.closing_balance2, &mut contract.withdrawn2),
        };
        if *withdrawn {
            return Err(LedgerError::new("party already withdrew"));
        }
        *withdrawn = true;

        *state.accounts.entry(submitter).or_insert(0) += amount;
        info!("channel {}: {} withdrew {}", channel, submitter, amount);
        Ok(())
    }

    fn with_contract<T>(
        &self,
        channel: &Address,
        f: impl FnOnce(&ChannelContract, BlockNumber) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let block = self.block_number();
        let state = self.state.lock();
        let contract = state
            .contracts
            .get(channel)
            .ok_or_else(|| LedgerError::new("no contract at this address"))?;
        f(contract, block)
    }
}

fn contract_mut<'a>(
    contracts: &'a mut HashMap<Address, ChannelContract>,
    channel: &Address,
) -> LedgerResult<&'a mut ChannelContract> {
    contracts
        .get_mut(channel)
        .ok_or_else(|| LedgerError::new("no contract at this address"))
}

fn derive_channel_address(party1: &Address, party2: &Address, nonce: u64) -> Address {
    let mut buf = Vec::with_capacity(12 + 20 + 20 + 8);
    buf.extend_from_slice(b"volt-channel");
    buf.extend_from_slice(party1.as_bytes());
    buf.extend_from_slice(party2.as_bytes());
    buf.extend_from_slice(&nonce.to_be_bytes());
    let hash = keccak256(&buf);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

fn check_state(
    contract: &ChannelContract,
    channel: Address,
    state: &ChannelStateMsg,
) -> LedgerResult<()> {
    if state.channel != channel {
        return Err(LedgerError::new("state is bound to another channel"));
    }
    if state.total() != contract.funding {
        return Err(LedgerError::new("balances do not sum to the funding amount"));
    }
    Ok(())
}

fn check_signature(
    contract: &ChannelContract,
    submitter: Party,
    state: &ChannelStateMsg,
) -> LedgerResult<()> {
    // Serial 0 is the locally self-signed baseline either side holds;
    // everything later must carry the counterparty's signature.
    if state.serial == 0 {
        if state.is_signed_by(&contract.party1) || state.is_signed_by(&contract.party2) {
            return Ok(());
        }
        return Err(LedgerError::new("initial state not signed by a channel party"));
    }
    let counterparty = match submitter {
        Party::One => contract.party2,
        Party::Two => contract.party1,
    };
    if state.is_signed_by(&counterparty) {
        Ok(())
    } else {
        Err(LedgerError::new("state not signed by the counterparty"))
    }
}

/// Ledger client bound to one submitting account
#[derive(Clone)]
pub struct SimLedgerClient {
    chain: SimLedger,
    account: Address,
}

impl SimLedgerClient {
    /// Account transactions are submitted from
    pub fn account(&self) -> Address {
        self.account
    }
}

impl LedgerClient for SimLedgerClient {
    fn deploy_channel(
        &self,
        party1: Address,
        party2: Address,
        appeal_period: u64,
        funding: Amount,
    ) -> LedgerResult<Address> {
        if party1 != self.account {
            return Err(LedgerError::new("deployment must be funded by the submitter"));
        }
        self.chain.deploy(party1, party2, appeal_period, funding)
    }

    fn block_number(&self) -> LedgerResult<BlockNumber> {
        Ok(self.chain.block_number())
    }

    fn account_balance(&self, account: Address) -> LedgerResult<Amount> {
        Ok(self.chain.account_balance(account))
    }

    fn status(&self, channel: Address) -> LedgerResult<ChannelStatus> {
        self.chain
            .with_contract(&channel, |c, block| Ok(c.status_at(block)))
    }

    fn parties(&self, channel: Address) -> LedgerResult<(Address, Address)> {
        self.chain
            .with_contract(&channel, |c, _| Ok((c.party1, c.party2)))
    }

    fn appeal_period(&self, channel: Address) -> LedgerResult<u64> {
        self.chain.with_contract(&channel, |c, _| Ok(c.appeal_period))
    }

    fn funding(&self, channel: Address) -> LedgerResult<Amount> {
        self.chain.with_contract(&channel, |c, _| Ok(c.funding))
    }

    fn recorded_closing_serial(&self, channel: Address) -> LedgerResult<Serial> {
        self.chain.with_contract(&channel, |c, _| {
            if c.closed_at.is_none() {
                return Err(LedgerError::new("channel has no recorded closing state"));
            }
            Ok(c.closing_serial)
        })
    }

    fn appeal_deadline(&self, channel: Address) -> LedgerResult<BlockNumber> {
        self.chain.with_contract(&channel, |c, _| {
            if c.closed_at.is_none() {
                return Err(LedgerError::new("channel has no appeal deadline"));
            }
            Ok(c.deadline)
        })
    }

    fn channel_balance(&self, channel: Address, party: Address) -> LedgerResult<Amount> {
        self.chain.with_contract(&channel, |c, _| {
            let party = c
                .party_of(party)
                .ok_or_else(|| LedgerError::new("not a channel party"))?;
            let amount = match (party, c.closed_at) {
                // before any close the on-chain view is the serial-0 split
                (Party::One, None) => c.funding,
                (Party::Two, None) => 0,
                (Party::One, Some(_)) if !c.withdrawn1 => c.closing_balance1,
                (Party::Two, Some(_)) if !c.withdrawn2 => c.closing_balance2,
                _ => 0,
            };
            Ok(amount)
        })
    }

    fn submit_close(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()> {
        self.chain.close(self.account, channel, state)
    }

    fn submit_appeal(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()> {
        self.chain.appeal(self.account, channel, state)
    }

    fn submit_withdraw(&self, channel: Address, party: Address) -> LedgerResult<()> {
        if party != self.account {
            return Err(LedgerError::new("withdrawal must be submitted by the payee"));
        }
        self.chain.withdraw(self.account, channel)
    }
}
