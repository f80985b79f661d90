//! Gas policy resolution.
//!
//! The node's suggested price becomes a plain-transfer policy (21000 gas),
//! which the operator may accept or replace. Whatever comes out is used for
//! every transaction of the batch.

use crate::{CoreError, GasDecision, Operator};
use alloy_primitives::{utils::parse_units, U256};
use disperse_delivery::DeliveryService;
use disperse_types::GasPolicy;

/// Resolves the gas policy of a batch against a connected node.
pub struct GasPolicyResolver {
	delivery: DeliveryService,
}

impl GasPolicyResolver {
	pub fn new(delivery: DeliveryService) -> Self {
		Self { delivery }
	}

	/// Reads the suggested price and lets the operator confirm or override.
	///
	/// A failed price query is fatal: there is no sensible default.
	pub async fn resolve(&self, operator: &dyn Operator) -> Result<GasPolicy, CoreError> {
		let suggested_price = self
			.delivery
			.gas_price()
			.await
			.map_err(|e| CoreError::GasQuery(e.to_string()))?;

		let suggested = GasPolicy::transfer(suggested_price);
		tracing::info!(
			gas_price_gwei = %suggested.unit_price_gwei(),
			gas_limit = suggested.gas_limit,
			"Suggested gas policy"
		);

		match operator.review_gas_policy(suggested).await? {
			GasDecision::Accept => Ok(suggested),
			GasDecision::Override(policy) => {
				if policy.gas_limit < GasPolicy::TRANSFER_GAS_LIMIT {
					tracing::warn!(
						gas_limit = policy.gas_limit,
						"Gas limit is below the cost of a plain transfer, sends will be rejected"
					);
				}
				tracing::info!(
					gas_price_gwei = %policy.unit_price_gwei(),
					gas_limit = policy.gas_limit,
					"Using operator gas policy"
				);
				Ok(policy)
			}
		}
	}
}

/// Parses a decimal gwei amount, e.g. `"1.5"`, into wei.
pub fn parse_gwei(price: &str) -> Result<u128, CoreError> {
	let trimmed = price.trim();
	if trimmed.is_empty() || trimmed.starts_with('-') {
		return Err(CoreError::InvalidGas(format!(
			"'{}' is not a non-negative gwei amount",
			trimmed
		)));
	}

	let wei: U256 = parse_units(trimmed, "gwei")
		.map_err(|e| CoreError::InvalidGas(format!("'{}': {}", trimmed, e)))?
		.into();

	u128::try_from(wei)
		.map_err(|_| CoreError::InvalidGas(format!("'{}' gwei is out of range", trimmed)))
}
