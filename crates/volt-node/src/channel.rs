//! Local channel records and inbound-message validation

use std::net::SocketAddr;

use thiserror::Error;
use volt_ledger::LedgerError;
use volt_primitives::{Address, Amount, BlockNumber};
use volt_types::{ChannelStateMsg, Party};

/// Local lifecycle of a channel record.
///
/// Withdrawal has no phase: a withdrawn channel's record is deleted and
/// must never reappear in enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Accepting off-chain updates
    Open,
    /// A close is recorded on the ledger; only appeal and withdraw remain
    Closing,
}

/// Why an inbound peer message was dropped.
///
/// Never surfaced to the peer; logged and forgotten.
#[derive(Debug, Error)]
pub(crate) enum Reject {
    #[error("channel already known")]
    AlreadyKnown,
    #[error("unknown channel")]
    UnknownChannel,
    #[error("this node is not the channel's second party")]
    NotOurChannel,
    #[error("channel is no longer open on the ledger")]
    AlreadyClosed,
    #[error("appeal period {got} below the configured minimum {min}")]
    AppealPeriodTooShort {
        got: u64,
        min: u64,
    },
    #[error("signature does not match the peer")]
    BadSignature,
    #[error("serial {got} not ahead of accepted serial {latest}")]
    StaleSerial {
        got: u64,
        latest: u64,
    },
    #[error("balances do not preserve the channel total")]
    TotalMismatch,
    #[error("transfer does not increase this node's balance")]
    NotIncoming,
    #[error("acknowledgment would reduce this node's balance")]
    BalanceRegression,
    #[error("could not sign state message")]
    Signing,
    #[error("ledger query failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// One node's view of a single payment channel.
///
/// Each party holds its own record; the two views may diverge until the
/// next acknowledged transfer. `latest_state` only ever holds messages
/// signed by the peer (plus the self-signed serial-0 baseline), so it is
/// always submittable on-chain. A transfer this node has sent but the
/// peer has not yet acknowledged lives in `pending_outgoing`.
#[derive(Clone, Debug)]
pub struct ChannelRecord {
    /// Address of the channel contract
    pub channel: Address,
    /// Which contract party this node is
    pub role: Party,
    /// The counterparty's account address
    pub peer_address: Address,
    /// Where the counterparty receives messages
    pub peer_location: SocketAddr,
    /// Local lifecycle phase
    pub phase: ChannelPhase,
    /// Latest accepted, on-chain-submittable state
    pub latest_state: ChannelStateMsg,
    /// Outgoing update awaiting the peer's acknowledgment
    pub pending_outgoing: Option<ChannelStateMsg>,
    /// Appeal deadline reported by the ledger after a close
    pub appeal_deadline: Option<BlockNumber>,
}

impl ChannelRecord {
    /// Fresh record in the open phase
    pub fn open(
        channel: Address,
        role: Party,
        peer_address: Address,
        peer_location: SocketAddr,
        initial: ChannelStateMsg,
    ) -> Self {
        Self {
            channel,
            role,
            peer_address,
            peer_location,
            phase: ChannelPhase::Open,
            latest_state: initial,
            pending_outgoing: None,
            appeal_deadline: None,
        }
    }

    /// State the next outgoing transfer chains on
    pub fn effective_state(&self) -> &ChannelStateMsg {
        self.pending_outgoing.as_ref().unwrap_or(&self.latest_state)
    }

    /// This node's spendable balance in the channel
    pub fn own_balance(&self) -> Amount {
        self.effective_state().balance_of(self.role)
    }

    /// Adopt a peer-signed state as the accepted tip.
    ///
    /// Clears the pending slot once the acknowledged serial has caught up
    /// with it.
    pub(crate) fn accept(&mut self, state: ChannelStateMsg) {
        if let Some(pending) = &self.pending_outgoing {
            if state.serial >= pending.serial {
                self.pending_outgoing = None;
            }
        }
        self.latest_state = state;
    }

    /// Validate an incoming funds transfer.
    ///
    /// Accepted only if peer-signed, strictly serial-advancing, total-
    /// preserving, and strictly increasing this node's balance relative
    /// to the last mutually signed state.
    pub(crate) fn check_incoming_transfer(&self, msg: &ChannelStateMsg) -> Result<(), Reject> {
        if !msg.is_signed_by(&self.peer_address) {
            return Err(Reject::BadSignature);
        }
        if msg.serial <= self.latest_state.serial {
            return Err(Reject::StaleSerial {
                got: msg.serial,
                latest: self.latest_state.serial,
            });
        }
        if msg.total() != self.latest_state.total() {
            return Err(Reject::TotalMismatch);
        }
        if msg.balance_of(self.role) <= self.latest_state.balance_of(self.role) {
            return Err(Reject::NotIncoming);
        }
        Ok(())
    }

    /// Validate a transfer acknowledgment.
    ///
    /// Deliberately looser than [`Self::check_incoming_transfer`]: any
    /// peer-signed, serial-advancing, total-preserving state that does
    /// not reduce this node's balance is adopted. It usually confirms
    /// our own pending offer, so the balance comparison runs against the
    /// effective (pending-inclusive) state.
    pub(crate) fn check_ack(&self, msg: &ChannelStateMsg) -> Result<(), Reject> {
        if !msg.is_signed_by(&self.peer_address) {
            return Err(Reject::BadSignature);
        }
        if msg.serial <= self.latest_state.serial {
            return Err(Reject::StaleSerial {
                got: msg.serial,
                latest: self.latest_state.serial,
            });
        }
        if msg.total() != self.latest_state.total() {
            return Err(Reject::TotalMismatch);
        }
        if msg.balance_of(self.role) < self.effective_state().balance_of(self.role) {
            return Err(Reject::BalanceRegression);
        }
        Ok(())
    }
}
