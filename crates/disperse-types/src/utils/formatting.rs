//! String formatting utilities.
//!
//! Unit conversion is delegated to `alloy_primitives::utils`; these helpers
//! only shape its output for the operator.

use alloy_primitives::utils::{format_ether, format_units};
use alloy_primitives::U256;

/// 0.01 gwei, the display precision of gas prices.
const GWEI_HUNDREDTH: u128 = 10_000_000;

/// Removes "0x" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a wei amount in whole native units without trailing zeros.
///
/// # Examples
///
/// `10^16` wei renders as `"0.01"`, `2 * 10^18` wei as `"2"`.
pub fn format_native(value: U256) -> String {
	let formatted = format_ether(value);
	if !formatted.contains('.') {
		return formatted;
	}
	formatted
		.trim_end_matches('0')
		.trim_end_matches('.')
		.to_string()
}

/// Renders a per-gas price in gwei with two decimals, rounded half up.
pub fn format_gwei_price(wei: u128) -> String {
	let rounded = wei.saturating_add(GWEI_HUNDREDTH / 2) / GWEI_HUNDREDTH * GWEI_HUNDREDTH;
	match format_units(U256::from(rounded), "gwei") {
		Ok(formatted) => match formatted.split_once('.') {
			Some((whole, fraction)) => {
				format!("{}.{:0<2}", whole, fraction.get(..2).unwrap_or(fraction))
			}
			None => format!("{}.00", formatted),
		},
		// "gwei" is a known unit
		Err(_) => rounded.to_string(),
	}
}
