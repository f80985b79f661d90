//! Network configuration types.
//!
//! A [`NetworkConfig`] describes the single chain a batch is sent on and the
//! funded sender key. It is loaded once by the caller and borrowed read-only
//! for the whole run.

use crate::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Connection and identity settings for one EVM network.
///
/// # Fields
///
/// * `rpc_url` - HTTP(S) JSON-RPC endpoint of the node
/// * `chain_id` - Chain id the operator expects the node to report
/// * `private_key` - Hex encoded key of the funded sender account
/// * `explorer_url` - Optional prefix that a transaction hash is appended to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_url: String,
	pub chain_id: u64,
	pub private_key: SecretString,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explorer_url: Option<String>,
}

impl NetworkConfig {
	/// Builds the block explorer link for a transaction hash, if configured.
	pub fn explorer_link(&self, tx_hash: impl fmt::Display) -> Option<String> {
		self.explorer_url
			.as_deref()
			.filter(|prefix| !prefix.is_empty())
			.map(|prefix| format!("{}{}", prefix, tx_hash))
	}
}

/// What the dispatcher does with its local nonce counter after a send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoncePolicy {
	/// Advance after every attempt, failed or not.
	///
	/// A send rejected before it reached the pool leaves its nonce unused,
	/// and later transactions queue behind that gap.
	#[default]
	AlwaysAdvance,
	/// Advance only when the node accepted the transaction, so the next
	/// recipient reuses the nonce of a rejected send.
	AdvanceOnSuccess,
}

impl fmt::Display for NoncePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NoncePolicy::AlwaysAdvance => f.write_str("always_advance"),
			NoncePolicy::AdvanceOnSuccess => f.write_str("advance_on_success"),
		}
	}
}

#[derive(Debug, Error)]
#[error("Unknown nonce policy '{0}', expected always_advance or advance_on_success")]
pub struct ParseNoncePolicyError(String);

impl FromStr for NoncePolicy {
	type Err = ParseNoncePolicyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().replace('-', "_").as_str() {
			"always_advance" => Ok(NoncePolicy::AlwaysAdvance),
			"advance_on_success" => Ok(NoncePolicy::AdvanceOnSuccess),
			other => Err(ParseNoncePolicyError(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn network(explorer_url: Option<&str>) -> NetworkConfig {
		NetworkConfig {
			rpc_url: "http://localhost:8545".to_string(),
			chain_id: 31337,
			private_key: SecretString::from("0x01"),
			explorer_url: explorer_url.map(str::to_string),
		}
	}

	#[test]
	fn test_explorer_link() {
		let config = network(Some("https://etherscan.io/tx/"));
		assert_eq!(
			config.explorer_link("0xabc").as_deref(),
			Some("https://etherscan.io/tx/0xabc")
		);
		assert_eq!(network(None).explorer_link("0xabc"), None);
		assert_eq!(network(Some("")).explorer_link("0xabc"), None);
	}

	#[test]
	fn test_nonce_policy_parsing() {
		assert_eq!(
			"always_advance".parse::<NoncePolicy>().unwrap(),
			NoncePolicy::AlwaysAdvance
		);
		assert_eq!(
			"Advance-On-Success".parse::<NoncePolicy>().unwrap(),
			NoncePolicy::AdvanceOnSuccess
		);
		assert!("sometimes".parse::<NoncePolicy>().is_err());
		assert_eq!(NoncePolicy::default(), NoncePolicy::AlwaysAdvance);
	}
}
