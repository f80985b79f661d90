//! Account management for the disperse batch sender.
//!
//! Two kinds of accounts take part in a batch: the funded sender, which signs
//! every transaction, and the freshly generated recipients. This crate
//! provides the signing abstraction for the former and the parallel keypair
//! generator for the latter.

use alloy_primitives::Bytes;
use disperse_types::{Address, TransactionHash, TransactionIntent};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}
pub mod keygen;

pub use implementations::local::LocalAccount;
pub use keygen::generate_accounts;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when fresh keys cannot be generated.
	#[error("Key generation failed: {0}")]
	Generation(String),
}

/// A transaction signed and encoded for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	/// Hash the node will report for this transaction.
	pub hash: TransactionHash,
	/// EIP-2718 encoded bytes.
	pub raw: Bytes,
}

/// Trait defining the interface for sender accounts.
///
/// Signing is local and synchronous; nothing here touches the network.
pub trait AccountInterface: Send + Sync {
	/// Address of the account.
	fn address(&self) -> Address;

	/// Signs a value transfer described by `intent`.
	fn sign_transaction(&self, intent: &TransactionIntent)
		-> Result<SignedTransaction, AccountError>;
}
