//! Signed channel state messages

use serde::{Deserialize, Serialize};
use thiserror::Error;
use volt_crypto::{keccak256, recover_signer, sign, CryptoError, PrivateKey, Signature};
use volt_primitives::{Address, Amount, Serial, H256};

/// State construction and validation errors
#[derive(Debug, Error)]
pub enum StateError {
    /// Transfer amount was zero
    #[error("transfer amount must be positive")]
    ZeroAmount,

    /// Transfer amount exceeds the sender's channel balance
    #[error("transfer of {requested} exceeds channel balance {available}")]
    InsufficientBalance {
        /// Balance on the sender's side of the channel
        available: Amount,
        /// Amount the sender tried to move
        requested: Amount,
    },

    /// Underlying signature operation failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// The two parties of a channel, in contract order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// The funding party (first owner on the contract)
    One,
    /// The receiving party (second owner on the contract)
    Two,
}

impl Party {
    /// The counterparty
    pub fn other(&self) -> Party {
        match self {
            Party::One => Party::Two,
            Party::Two => Party::One,
        }
    }
}

/// Wire form of an ECDSA signature (v, r, s)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSig {
    /// Recovery id (27 or 28)
    pub v: u8,
    /// r component
    pub r: H256,
    /// s component
    pub s: H256,
}

impl From<Signature> for StateSig {
    fn from(sig: Signature) -> Self {
        StateSig {
            v: sig.v,
            r: H256::from_bytes(sig.r),
            s: H256::from_bytes(sig.s),
        }
    }
}

impl From<StateSig> for Signature {
    fn from(sig: StateSig) -> Self {
        Signature::new(*sig.r.as_bytes(), *sig.s.as_bytes(), sig.v)
    }
}

/// A signed snapshot of one channel's balances at a given serial number.
///
/// The signature covers every other field; whoever a message claims to
/// come from must be recoverable from it. Serial numbers order successive
/// states and arbitrate disputes on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStateMsg {
    /// Address of the channel contract this state belongs to
    pub channel: Address,
    /// Balance on party one's side
    pub balance1: Amount,
    /// Balance on party two's side
    pub balance2: Amount,
    /// Monotonic state counter
    pub serial: Serial,
    /// Signature over (channel, balance1, balance2, serial)
    pub sig: StateSig,
}

impl ChannelStateMsg {
    /// Digest signed for a given state tuple.
    ///
    /// Fixed-width layout: channel address, both balances big-endian,
    /// serial big-endian.
    pub fn signing_digest(
        channel: &Address,
        balance1: Amount,
        balance2: Amount,
        serial: Serial,
    ) -> H256 {
        let mut buf = [0u8; 20 + 16 + 16 + 8];
        buf[..20].copy_from_slice(channel.as_bytes());
        buf[20..36].copy_from_slice(&balance1.to_be_bytes());
        buf[36..52].copy_from_slice(&balance2.to_be_bytes());
        buf[52..].copy_from_slice(&serial.to_be_bytes());
        keccak256(&buf)
    }

    fn signed(
        channel: Address,
        balance1: Amount,
        balance2: Amount,
        serial: Serial,
        key: &PrivateKey,
    ) -> Result<Self, StateError> {
        let digest = Self::signing_digest(&channel, balance1, balance2, serial);
        let sig = sign(&digest, key)?;
        Ok(ChannelStateMsg {
            channel,
            balance1,
            balance2,
            serial,
            sig: sig.into(),
        })
    }

    /// Serial-0 state with the whole funding amount on party one's side
    pub fn initial(channel: Address, funding: Amount, key: &PrivateKey) -> Result<Self, StateError> {
        Self::signed(channel, funding, 0, 0, key)
    }

    /// Next state moving `amount` from `sender`'s side to the other side
    pub fn transfer(
        &self,
        sender: Party,
        amount: Amount,
        key: &PrivateKey,
    ) -> Result<Self, StateError> {
        if amount == 0 {
            return Err(StateError::ZeroAmount);
        }
        let available = self.balance_of(sender);
        if amount > available {
            return Err(StateError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        let (balance1, balance2) = match sender {
            Party::One => (self.balance1 - amount, self.balance2 + amount),
            Party::Two => (self.balance1 + amount, self.balance2 - amount),
        };
        Self::signed(self.channel, balance1, balance2, self.serial + 1, key)
    }

    /// Same balances and serial, re-signed with the local key (the ACK payload)
    pub fn countersigned(&self, key: &PrivateKey) -> Result<Self, StateError> {
        Self::signed(self.channel, self.balance1, self.balance2, self.serial, key)
    }

    /// Digest of this message's signed fields
    pub fn digest(&self) -> H256 {
        Self::signing_digest(&self.channel, self.balance1, self.balance2, self.serial)
    }

    /// Recover the address that signed this message
    pub fn signer(&self) -> Result<Address, StateError> {
        Ok(recover_signer(&self.digest(), &self.sig.into())?)
    }

    /// Check the signature against a purported sender
    pub fn is_signed_by(&self, signer: &Address) -> bool {
        matches!(self.signer(), Ok(recovered) if recovered == *signer)
    }

    /// Balance on the given party's side
    pub fn balance_of(&self, party: Party) -> Amount {
        match party {
            Party::One => self.balance1,
            Party::Two => self.balance2,
        }
    }

    /// Total locked in the channel.
    ///
    /// Saturating: a forged balance pair that overflows can never equal a
    /// real channel total, so comparisons against it still reject.
    pub fn total(&self) -> Amount {
        self.balance1.saturating_add(self.balance2)
    }
}
