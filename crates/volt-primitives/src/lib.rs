//! # volt-primitives
//!
//! Primitive types for the volt payment-channel node.
//!
//! This crate provides the fundamental data types used throughout the system.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

/// Ledger block height type
pub type BlockNumber = u64;

/// Channel state serial number type
pub type Serial = u64;

/// On-ledger amount type
pub type Amount = u128;
