//! Gas policy applied uniformly to every transaction of a batch.

use crate::utils::format_gwei_price;
use serde::{Deserialize, Serialize};

/// Fee settings for a batch of legacy (pre-EIP-1559) value transfers.
///
/// Chosen once before dispatch begins and never varied per recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
	/// Price paid per unit of gas, in wei.
	pub unit_price: u128,
	/// Maximum gas units each transaction may consume.
	pub gas_limit: u64,
}

impl GasPolicy {
	/// Intrinsic gas of a plain value transfer with empty calldata.
	pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

	/// Policy for a plain transfer at the given unit price.
	pub fn transfer(unit_price: u128) -> Self {
		Self {
			unit_price,
			gas_limit: Self::TRANSFER_GAS_LIMIT,
		}
	}

	/// Unit price rendered in gwei, rounded to two decimals.
	pub fn unit_price_gwei(&self) -> String {
		format_gwei_price(self.unit_price)
	}
}
