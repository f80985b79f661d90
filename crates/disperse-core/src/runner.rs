//! End-to-end orchestration of a batch.

use crate::{
	preflight, BatchDispatcher, CoreError, DispatchSettings, GasPolicyResolver, Operator,
};
use alloy_primitives::{utils::parse_ether, U256};
use disperse_account::{generate_accounts, AccountInterface};
use disperse_delivery::DeliveryService;
use disperse_types::{
	BatchSummary, GasPolicy, NetworkConfig, NoncePolicy, TransactionOutcome,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct BatchRequest {
	/// Number of fresh recipients to create and fund.
	pub recipient_count: usize,
	/// Per-recipient amount in native units, e.g. `"0.01"`.
	pub amount: String,
	pub delay: Duration,
	/// Gas policy fixed up front. `None` asks the node and the operator.
	pub gas_override: Option<GasPolicy>,
	pub nonce_policy: NoncePolicy,
}

/// Parses a decimal amount of native currency into wei.
pub fn parse_amount(amount: &str) -> Result<U256, CoreError> {
	let trimmed = amount.trim();
	if trimmed.is_empty() || trimmed.starts_with('-') {
		return Err(CoreError::InvalidAmount(format!(
			"'{}' is not a non-negative amount",
			trimmed
		)));
	}
	parse_ether(trimmed).map_err(|e| CoreError::InvalidAmount(format!("'{}': {}", trimmed, e)))
}

/// Runs the phases of a batch against one node with one sender.
pub struct BatchRunner {
	network: NetworkConfig,
	delivery: DeliveryService,
	sender: Arc<dyn AccountInterface>,
	operator: Arc<dyn Operator>,
	cancel: Option<watch::Receiver<bool>>,
}

impl BatchRunner {
	pub fn new(
		network: NetworkConfig,
		delivery: DeliveryService,
		sender: Arc<dyn AccountInterface>,
		operator: Arc<dyn Operator>,
	) -> Self {
		Self {
			network,
			delivery,
			sender,
			operator,
			cancel: None,
		}
	}

	pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
		self.cancel = Some(cancel);
		self
	}

	/// Checks the node's chain id against the configured one.
	pub async fn preflight(&self) -> Result<u64, CoreError> {
		preflight(
			&self.delivery,
			self.network.chain_id,
			self.operator.as_ref(),
		)
		.await
	}

	/// Returns `gas_override` when given, otherwise asks node and operator.
	pub async fn resolve_gas(
		&self,
		gas_override: Option<GasPolicy>,
	) -> Result<GasPolicy, CoreError> {
		match gas_override {
			Some(policy) => {
				tracing::info!(
					gas_price_gwei = %policy.unit_price_gwei(),
					gas_limit = policy.gas_limit,
					"Using gas policy from command line"
				);
				Ok(policy)
			}
			None => {
				GasPolicyResolver::new(self.delivery.clone())
					.resolve(self.operator.as_ref())
					.await
			}
		}
	}

	/// Generates the recipients and dispatches the batch with `gas`.
	///
	/// # Arguments
	///
	/// * `request` - Recipient count and per-recipient amount
	/// * `gas` - Gas policy applied to every transfer
	/// * `on_outcome` - Called with each outcome as soon as its send completes
	///
	/// # Returns
	///
	/// The batch summary. A failed send is recorded as an outcome, not
	/// returned as an error.
	///
	/// # Errors
	///
	/// Returns `CoreError::InvalidAmount`, `CoreError::KeyGeneration` or
	/// `CoreError::Nonce` when the batch cannot start.
	pub async fn execute<F>(
		&self,
		request: &BatchRequest,
		gas: GasPolicy,
		mut on_outcome: F,
	) -> Result<BatchSummary, CoreError>
	where
		F: FnMut(&TransactionOutcome),
	{
		let value = parse_amount(&request.amount)?;

		let recipients = generate_accounts(request.recipient_count)
			.await
			.map_err(|e| CoreError::KeyGeneration(e.to_string()))?;
		tracing::info!(count = recipients.len(), "Generated recipient accounts");

		let settings = DispatchSettings {
			value,
			gas,
			chain_id: self.network.chain_id,
			delay: request.delay,
			nonce_policy: request.nonce_policy,
		};
		let mut dispatcher =
			BatchDispatcher::new(self.delivery.clone(), self.sender.clone(), settings);
		if let Some(cancel) = &self.cancel {
			dispatcher = dispatcher.with_cancellation(cancel.clone());
		}

		let stream = dispatcher
			.dispatch(recipients.iter().map(|r| r.address).collect())
			.await?;
		futures::pin_mut!(stream);

		let mut outcomes = Vec::with_capacity(recipients.len());
		while let Some(outcome) = stream.next().await {
			on_outcome(&outcome);
			outcomes.push(outcome);
		}

		let summary = BatchSummary {
			outcomes,
			recipients,
			value,
			gas,
		};
		tracing::info!(
			sent = summary.sent(),
			failed = summary.failed(),
			complete = summary.is_complete(),
			"Batch finished"
		);
		Ok(summary)
	}

	/// Runs every phase in order: preflight, gas, keys, dispatch.
	pub async fn run<F>(&self, request: &BatchRequest, on_outcome: F) -> Result<BatchSummary, CoreError>
	where
		F: FnMut(&TransactionOutcome),
	{
		// Reject a bad amount before touching the node.
		parse_amount(&request.amount)?;

		self.preflight().await?;
		let gas = self.resolve_gas(request.gas_override).await?;
		self.execute(request, gas, on_outcome).await
	}
}
