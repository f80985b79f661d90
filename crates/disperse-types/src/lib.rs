//! Common types for the disperse batch sender.
//!
//! This crate holds the data model shared by the account, delivery and core
//! crates: the network configuration handed in by the caller, the gas policy
//! fixed for a batch, the generated recipient accounts and the per-recipient
//! intents and outcomes the dispatcher produces.

/// Gas policy types.
pub mod gas;
/// Network configuration supplied by the caller.
pub mod networks;
/// Zeroizing secret wrapper for private keys.
pub mod secret_string;
/// Recipients, intents and outcomes of a batch.
pub mod transaction;
/// Utility functions for common formatting.
pub mod utils;

pub use alloy_primitives::{Address, U256};
pub use gas::GasPolicy;
pub use networks::{NetworkConfig, NoncePolicy, ParseNoncePolicyError};
pub use secret_string::{KeyFormatError, SecretString, PRIVATE_KEY_LEN};
pub use transaction::{
	BatchSummary, OutcomeResult, RecipientAccount, TransactionHash, TransactionIntent,
	TransactionOutcome,
};
pub use utils::{format_gwei_price, format_native};
