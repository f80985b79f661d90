//! Decisions the batch engine delegates to the human operator.

use crate::CoreError;
use async_trait::async_trait;
use disperse_types::GasPolicy;

/// Operator's answer to a suggested gas policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasDecision {
	/// Use the suggestion as is.
	Accept,
	/// Use this policy instead, verbatim.
	Override(GasPolicy),
}

/// Trait for the interactive safety gates of a batch.
///
/// The terminal front end prompts on stdin; tests script the answers.
#[async_trait]
pub trait Operator: Send + Sync {
	/// Called when the node reports a chain id other than the configured
	/// one. Returning `false` aborts the batch before anything is sent.
	async fn confirm_chain_mismatch(&self, configured: u64, observed: u64) -> bool;

	/// Presents the suggested policy and returns the one to use.
	async fn review_gas_policy(&self, suggested: GasPolicy) -> Result<GasDecision, CoreError>;
}
