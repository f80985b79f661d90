//! Core batch engine of the disperse sender.
//!
//! A batch runs through four phases, each in its own module:
//!
//! 1. preflight ([`dispatcher::preflight`]): confirm the node serves the
//!    configured chain, or get the operator's explicit consent to continue;
//! 2. gas policy ([`gas::GasPolicyResolver`]): one price and limit for the
//!    whole batch;
//! 3. key generation ([`disperse_account::generate_accounts`]): fresh
//!    recipients, in parallel;
//! 4. dispatch ([`dispatcher::BatchDispatcher`]): one nonce read, then one
//!    signed transfer per recipient in strict nonce order.
//!
//! [`runner::BatchRunner`] drives the phases in order. Only errors raised
//! before dispatch starts are fatal; a failed send is reported as a failed
//! outcome and the batch carries on.

use thiserror::Error;

pub mod dispatcher;
pub mod gas;
pub mod operator;
pub mod runner;

#[cfg(test)]
pub(crate) mod mock;

pub use dispatcher::{preflight, BatchDispatcher, DispatchSettings};
pub use gas::{parse_gwei, GasPolicyResolver};
pub use operator::{GasDecision, Operator};
pub use runner::{parse_amount, BatchRequest, BatchRunner};

/// Errors that end a batch before or at the start of dispatch.
#[derive(Debug, Error)]
pub enum CoreError {
	/// The node could not be queried during preflight.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The node serves a different chain and the operator chose to stop.
	#[error(
		"Chain ID mismatch: configured {configured}, node reports {observed}; aborted by operator"
	)]
	ChainMismatchDeclined { configured: u64, observed: u64 },
	/// The suggested gas price could not be read.
	#[error("Gas price query failed: {0}")]
	GasQuery(String),
	/// An operator supplied gas value could not be used.
	#[error("Invalid gas setting: {0}")]
	InvalidGas(String),
	/// The per-recipient amount could not be parsed.
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	/// The sender's nonce baseline could not be read.
	#[error("Failed to read sender nonce: {0}")]
	Nonce(String),
	/// Recipient keys could not be generated.
	#[error("Key generation failed: {0}")]
	KeyGeneration(String),
	/// Operator input could not be read.
	#[error("Operator input error: {0}")]
	Operator(String),
}
