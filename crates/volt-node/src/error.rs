//! Node error types (the local-call regime)

use thiserror::Error;
use volt_ledger::LedgerError;
use volt_types::StateError;

/// Errors surfaced to the local caller of node operations.
///
/// Remote-message handlers never produce these; invalid peer input is
/// dropped internally.
#[derive(Debug, Error)]
pub enum NodeError {
    /// No record exists for the given channel address
    #[error("unknown channel")]
    UnknownChannel,

    /// The channel is no longer open for this operation
    #[error("channel already closed")]
    ChannelClosed,

    /// Amount was zero or exceeds the available balance
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The channel is not in a state an appeal applies to
    #[error("no appeal needed: {0}")]
    AppealNotNeeded(String),

    /// The appeal window has already elapsed
    #[error("appeal window expired")]
    AppealWindowExpired,

    /// The appeal window has not elapsed yet
    #[error("channel not yet withdrawable")]
    NotYetWithdrawable,

    /// The ledger rejected a transaction or query
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Building or signing a state message failed
    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
