//! Recipient, intent and outcome types of a batch.
//!
//! A batch turns a list of [`RecipientAccount`]s into one
//! [`TransactionIntent`] each and reports exactly one [`TransactionOutcome`]
//! per intent, in submission order.

use crate::{GasPolicy, SecretString};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A freshly generated account that receives funds in this batch.
///
/// Lives in memory only. The key is never written to disk by this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientAccount {
	pub address: Address,
	pub private_key: SecretString,
}

/// A value transfer to be signed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
	pub nonce: u64,
	pub to: Address,
	/// Amount transferred, in wei.
	pub value: U256,
	pub gas: GasPolicy,
	pub chain_id: u64,
}

/// Canonical 32-byte transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// B256 displays as 0x-prefixed lowercase hex.
		write!(f, "{}", self.0)
	}
}

/// Result of attempting to send one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
	/// Accepted into the node's pending pool. Not necessarily mined.
	Sent(TransactionHash),
	/// Signing or submission failed; the message is the underlying error.
	Failed(String),
}

/// Report for a single recipient of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
	/// Position of the recipient in the batch, starting at 0.
	pub index: usize,
	pub recipient: Address,
	/// Nonce the transaction was signed with.
	pub nonce: u64,
	pub result: OutcomeResult,
}

impl TransactionOutcome {
	pub fn sent(index: usize, recipient: Address, nonce: u64, hash: TransactionHash) -> Self {
		Self {
			index,
			recipient,
			nonce,
			result: OutcomeResult::Sent(hash),
		}
	}

	pub fn failed(index: usize, recipient: Address, nonce: u64, error: impl Into<String>) -> Self {
		Self {
			index,
			recipient,
			nonce,
			result: OutcomeResult::Failed(error.into()),
		}
	}

	pub fn is_sent(&self) -> bool {
		matches!(self.result, OutcomeResult::Sent(_))
	}

	pub fn tx_hash(&self) -> Option<&TransactionHash> {
		match &self.result {
			OutcomeResult::Sent(hash) => Some(hash),
			OutcomeResult::Failed(_) => None,
		}
	}

	pub fn error(&self) -> Option<&str> {
		match &self.result {
			OutcomeResult::Sent(_) => None,
			OutcomeResult::Failed(message) => Some(message),
		}
	}
}

/// Everything a finished batch hands back to the caller for final reporting.
#[derive(Debug, Clone)]
pub struct BatchSummary {
	/// One entry per attempted recipient, in submission order.
	pub outcomes: Vec<TransactionOutcome>,
	/// All generated recipients, including any never attempted after a cancel.
	pub recipients: Vec<RecipientAccount>,
	/// Amount sent to each recipient, in wei.
	pub value: U256,
	pub gas: GasPolicy,
}

impl BatchSummary {
	pub fn sent(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_sent()).count()
	}

	pub fn failed(&self) -> usize {
		self.outcomes.len() - self.sent()
	}

	/// True when every recipient got an outcome.
	pub fn is_complete(&self) -> bool {
		self.outcomes.len() == self.recipients.len()
	}
}
