//! Operator-facing report text.

use disperse_types::{
	format_native, BatchSummary, GasPolicy, NetworkConfig, OutcomeResult,
	TransactionOutcome, U256,
};
use std::fmt::Write;

const BANNER: &str = r#"
 ######  ####  ######  ########  ######## ########   ######  ########
 ##   ##  ##  ##    ## ##     ## ##       ##     ## ##    ## ##
 ##   ##  ##  ##       ##     ## ##       ##     ## ##       ##
 ##   ##  ##   ######  ########  ######   ########   ######  ######
 ##   ##  ##        ## ##        ##       ##   ##         ## ##
 ##   ##  ##  ##    ## ##        ##       ##    ##  ##    ## ##
 ######  ####  ######  ##        ######## ##     ##  ######  ########
"#;

const SEPARATOR: &str = "--------------------";

pub fn banner() -> String {
	format!("{}\n{}\n", BANNER, "=".repeat(70))
}

/// Renders a wei amount in whole native units.
pub fn native_amount(value: U256) -> String {
	format!("{} ETH", format_native(value))
}

pub fn gas_settings(policy: &GasPolicy) -> String {
	format!(
		"\nCurrent gas settings:\nGas Price: {} Gwei\nGas Limit: {}\n",
		policy.unit_price_gwei(),
		policy.gas_limit
	)
}

/// Report block for one recipient, numbered from 1.
pub fn outcome(outcome: &TransactionOutcome, value: U256, network: &NetworkConfig) -> String {
	let mut out = String::new();
	let number = outcome.index + 1;
	match &outcome.result {
		OutcomeResult::Sent(hash) => {
			let _ = writeln!(out, "Transaction {} sent:", number);
			let _ = writeln!(out, "  To: {}", outcome.recipient);
			let _ = writeln!(out, "  Amount: {}", native_amount(value));
			let _ = writeln!(out, "  Nonce: {}", outcome.nonce);
			let _ = writeln!(out, "  Transaction Hash: {}", hash);
			if let Some(link) = network.explorer_link(hash) {
				let _ = writeln!(out, "  Block Explorer Link: {}", link);
			}
		}
		OutcomeResult::Failed(error) => {
			let _ = writeln!(out, "Transaction {} failed:", number);
			let _ = writeln!(out, "  To: {}", outcome.recipient);
			let _ = writeln!(out, "  Nonce: {}", outcome.nonce);
			let _ = writeln!(out, "  Error: {}", error);
		}
	}
	out.push_str(SEPARATOR);
	out
}

/// Closing report: counts, then every generated wallet.
///
/// Private keys are included only when `show_keys` is set.
pub fn summary(summary: &BatchSummary, show_keys: bool) -> String {
	let mut out = String::new();
	if summary.is_complete() {
		let _ = writeln!(out, "\nAll transactions sent.");
	} else {
		let _ = writeln!(
			out,
			"\nBatch cancelled after {} of {} transactions.",
			summary.outcomes.len(),
			summary.recipients.len()
		);
	}
	let _ = writeln!(
		out,
		"Sent: {}, failed: {}",
		summary.sent(),
		summary.failed()
	);

	let _ = writeln!(out, "\nNew wallet addresses:");
	for (i, wallet) in summary.recipients.iter().enumerate() {
		if show_keys {
			let _ = writeln!(
				out,
				"Wallet {}: {} (private key: {})",
				i + 1,
				wallet.address,
				wallet.private_key.expose_secret()
			);
		} else {
			let _ = writeln!(out, "Wallet {}: {}", i + 1, wallet.address);
		}
	}
	out
}
