//! Main entry point for the disperse batch sender.
//!
//! This binary funds a batch of freshly generated wallets from one sender
//! account. It loads or asks for the network configuration, checks the node,
//! settles the gas policy with the operator and streams one report block per
//! transaction as the batch is dispatched.

use clap::Parser;
use disperse_account::{AccountInterface, LocalAccount};
use disperse_config::Config;
use disperse_core::{parse_amount, parse_gwei, BatchRequest, BatchRunner};
use disperse_delivery::{DeliveryError, DeliveryService};
use disperse_types::{GasPolicy, NetworkConfig, NoncePolicy, SecretString};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

mod operator;
mod prompt;
mod report;

use operator::TerminalOperator;

/// Command-line arguments for the disperse sender.
///
/// The configuration file stores the sender private key in cleartext.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file (holds the sender private key in cleartext)
	#[arg(short, long, default_value = "disperse.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	/// Number of wallets to create and fund
	#[arg(short = 'n', long)]
	count: Option<usize>,

	/// Amount of native currency sent to each wallet, e.g. 0.01
	#[arg(short, long)]
	amount: Option<String>,

	/// Delay between transactions in milliseconds
	#[arg(long)]
	delay_ms: Option<u64>,

	/// Gas price in gwei; skips the gas price query and prompt
	#[arg(long)]
	gas_price_gwei: Option<String>,

	/// Gas limit per transaction, used with --gas-price-gwei
	#[arg(long, requires = "gas_price_gwei")]
	gas_limit: Option<u64>,

	/// Nonce handling after a failed send (always_advance, advance_on_success)
	#[arg(long)]
	nonce_policy: Option<NoncePolicy>,

	/// Never prompt: reuse the saved configuration and accept the suggested gas
	#[arg(short, long)]
	yes: bool,

	/// Print the private keys of the generated wallets
	#[arg(long)]
	show_keys: bool,

	/// Ignore the saved configuration and ask for a new one
	#[arg(long, conflicts_with = "yes")]
	reconfigure: bool,
}

/// Main entry point for the disperse sender.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads or asks for the configuration
/// 4. Connects to the node and checks its chain id
/// 5. Resolves the gas policy and the batch parameters
/// 6. Dispatches the batch, stopping early on Ctrl-C
///
/// A fatal error is printed once and ends the process with a failure code.
#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// Create env filter with default from args
	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	// Diagnostics go to stderr so they do not interleave with prompts
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	match run(&args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{}", fatal_message(e.as_ref()));
			ExitCode::FAILURE
		}
	}
}

/// Runs one batch from configuration to final report.
async fn run(args: &Args) -> Result<(), Box<dyn Error>> {
	println!("{}", report::banner());

	let mut config = obtain_config(args).await?;
	if let Some(policy) = args.nonce_policy {
		config.dispatch.nonce_policy = policy;
	}
	tracing::info!(
		chain_id = config.network.chain_id,
		nonce_policy = %config.dispatch.nonce_policy,
		"Loaded configuration"
	);

	let delivery = DeliveryService::connect(&config.network.rpc_url, config.dispatch.rpc_timeout())
		.await
		.map_err(connection_failed)?;

	let sender = LocalAccount::from_secret(&config.network.private_key)?;
	println!("Sender: {}", sender.address());

	let (cancel_tx, cancel_rx) = watch::channel(false);
	let runner = BatchRunner::new(
		config.network.clone(),
		delivery,
		Arc::new(sender),
		Arc::new(TerminalOperator::new(args.yes)),
	)
	.with_cancellation(cancel_rx);

	runner.preflight().await?;

	let gas_override = match &args.gas_price_gwei {
		Some(price) => Some(GasPolicy {
			unit_price: parse_gwei(price)?,
			gas_limit: args.gas_limit.unwrap_or(GasPolicy::TRANSFER_GAS_LIMIT),
		}),
		None => None,
	};
	let gas = runner.resolve_gas(gas_override).await?;

	let request = batch_request(args, &config, gas_override).await?;
	let value = parse_amount(&request.amount)?;

	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("Interrupt received, stopping after the current transaction");
			let _ = cancel_tx.send(true);
		}
	});

	println!(
		"\nSending {} to each of {} new wallets.\n",
		report::native_amount(value),
		request.recipient_count
	);

	let network = &config.network;
	let summary = runner
		.execute(&request, gas, |outcome| {
			println!("{}", report::outcome(outcome, value, network));
		})
		.await?;

	println!("{}", report::summary(&summary, args.show_keys));
	Ok(())
}

/// Single line shown for an error that ends the run.
fn fatal_message(error: &dyn Error) -> String {
	format!("Error: {}", error)
}

fn connection_failed(error: DeliveryError) -> Box<dyn Error> {
	format!(
		"Failed to connect to the network ({}). Please check your RPC URL.",
		error
	)
	.into()
}

/// Returns the saved configuration or asks for a new one and saves it.
async fn obtain_config(args: &Args) -> Result<Config, Box<dyn Error>> {
	if !args.reconfigure {
		if let Some(config) = Config::load(&args.config).await? {
			if args.yes
				|| prompt::confirm("Do you want to use the previous configuration?").await?
			{
				return Ok(config);
			}
		} else if args.yes {
			return Err(format!(
				"No configuration found at {}; run without --yes to create one",
				args.config.display()
			)
			.into());
		}
	}

	let config = Config::new(ask_network().await?);
	config.save(&args.config).await?;
	println!(
		"Configuration saved to {} (the private key is stored in cleartext).",
		args.config.display()
	);
	Ok(config)
}

async fn ask_network() -> std::io::Result<NetworkConfig> {
	let rpc_url = prompt::ask_with("Enter the RPC URL: ", None, |s| {
		if s.starts_with("http://") || s.starts_with("https://") {
			Ok(s.to_string())
		} else {
			Err("expected an http:// or https:// URL")
		}
	})
	.await?;
	let chain_id = prompt::ask_with("Enter the Chain ID: ", None, |s| s.parse::<u64>()).await?;
	let private_key = prompt::ask_with("Enter your private key: ", None, |s| {
		let secret = SecretString::from(s);
		LocalAccount::from_secret(&secret).map(|_| secret)
	})
	.await?;
	let explorer_url = prompt::ask(
		"Enter the Block Explorer URL (e.g., https://etherscan.io/tx/), or leave empty: ",
	)
	.await?;

	Ok(NetworkConfig {
		rpc_url,
		chain_id,
		private_key,
		explorer_url: Some(explorer_url).filter(|url| !url.is_empty()),
	})
}

/// Collects the batch parameters from the command line or the terminal.
async fn batch_request(
	args: &Args,
	config: &Config,
	gas_override: Option<GasPolicy>,
) -> Result<BatchRequest, Box<dyn Error>> {
	let recipient_count = match args.count {
		Some(count) => count,
		None if args.yes => return Err("--count is required with --yes".into()),
		None => {
			prompt::ask_with(
				"Enter the number of wallets you want to create: ",
				None,
				|s| s.parse::<usize>(),
			)
			.await?
		}
	};

	let amount = match &args.amount {
		Some(amount) => amount.clone(),
		None if args.yes => return Err("--amount is required with --yes".into()),
		None => {
			prompt::ask_with(
				"Enter the amount of ETH to send to each wallet: ",
				None,
				|s| parse_amount(s).map(|_| s.to_string()),
			)
			.await?
		}
	};

	let delay = match args.delay_ms {
		Some(delay_ms) => Duration::from_millis(delay_ms),
		None if args.yes => config.dispatch.delay(),
		None => {
			let default_ms = config.dispatch.delay_ms;
			let delay_ms = prompt::ask_with(
				&format!(
					"Enter the delay between transactions in milliseconds (default {}): ",
					default_ms
				),
				Some(default_ms),
				|s| s.parse::<u64>(),
			)
			.await?;
			Duration::from_millis(delay_ms)
		}
	};

	Ok(BatchRequest {
		recipient_count,
		amount,
		delay,
		gas_override,
		nonce_policy: config.dispatch.nonce_policy,
	})
}
