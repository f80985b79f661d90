//! Terminal implementation of the batch safety gates.

use crate::{prompt, report};
use async_trait::async_trait;
use disperse_core::{parse_gwei, CoreError, GasDecision, Operator};
use disperse_types::GasPolicy;

/// Asks the operator on stdin.
///
/// With `assume_yes` the suggested gas policy is accepted without asking,
/// and a chain id mismatch aborts the batch.
pub struct TerminalOperator {
	assume_yes: bool,
}

impl TerminalOperator {
	pub fn new(assume_yes: bool) -> Self {
		Self { assume_yes }
	}
}

#[async_trait]
impl Operator for TerminalOperator {
	async fn confirm_chain_mismatch(&self, configured: u64, observed: u64) -> bool {
		println!(
			"Warning: The provided Chain ID ({}) does not match the network's Chain ID ({}).",
			configured, observed
		);
		if self.assume_yes {
			println!("Not continuing on a mismatched network in non-interactive mode.");
			return false;
		}
		match prompt::confirm("Do you want to continue anyway?").await {
			Ok(answer) => answer,
			Err(e) => {
				tracing::warn!(error = %e, "Could not read confirmation");
				false
			}
		}
	}

	async fn review_gas_policy(&self, suggested: GasPolicy) -> Result<GasDecision, CoreError> {
		print!("{}", report::gas_settings(&suggested));
		if self.assume_yes {
			return Ok(GasDecision::Accept);
		}

		let operator_error = |e: std::io::Error| CoreError::Operator(e.to_string());

		if prompt::confirm("\nDo you want to use these gas settings?")
			.await
			.map_err(operator_error)?
		{
			return Ok(GasDecision::Accept);
		}

		let unit_price = prompt::ask_with("Enter new Gas Price (in Gwei): ", None, parse_gwei)
			.await
			.map_err(operator_error)?;
		let gas_limit = prompt::ask_with(
			"Enter new Gas Limit: ",
			Some(suggested.gas_limit),
			|s| s.parse::<u64>(),
		)
		.await
		.map_err(operator_error)?;

		Ok(GasDecision::Override(GasPolicy {
			unit_price,
			gas_limit,
		}))
	}
}
