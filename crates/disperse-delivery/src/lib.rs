//! Transaction delivery for the disperse batch sender.
//!
//! This crate is the sender-side view of the node's JSON-RPC surface: a
//! connectivity check, the three read queries a batch needs (chain id, gas
//! price, pending nonce) and raw transaction submission. Every call made
//! through [`DeliveryService`] is bounded by a per-call timeout so a stalled
//! node surfaces as an error instead of hanging the batch.

use async_trait::async_trait;
use disperse_types::{Address, TransactionHash};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::AlloyChainClient;

/// Errors that can occur during node communication.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The endpoint is malformed or unreachable.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The node answered with an error, or the transport failed mid-call.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The node did not answer within the per-call timeout.
	#[error("{operation} timed out after {}ms", after.as_millis())]
	Timeout {
		operation: &'static str,
		after: Duration,
	},
}

/// Trait defining the JSON-RPC operations a batch needs from a node.
///
/// The read queries are safe to repeat. `send_raw_transaction` is not, and
/// callers never resubmit on their own.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Chain identifier reported by the node (`eth_chainId`).
	async fn chain_id(&self) -> Result<u64, DeliveryError>;

	/// Suggested legacy gas price in wei (`eth_gasPrice`).
	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Next nonce of `address`, counting pending transactions
	/// (`eth_getTransactionCount` at the `pending` tag).
	async fn transaction_count(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Broadcasts a signed, EIP-2718 encoded transaction
	/// (`eth_sendRawTransaction`).
	///
	/// Success means the node admitted the transaction to its pending pool.
	async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TransactionHash, DeliveryError>;
}

/// Service that applies a per-call timeout to a [`ChainClient`].
#[derive(Clone)]
pub struct DeliveryService {
	client: Arc<dyn ChainClient>,
	timeout: Duration,
}

impl DeliveryService {
	/// Wraps an existing client.
	pub fn new(client: Arc<dyn ChainClient>, timeout: Duration) -> Self {
		Self { client, timeout }
	}

	/// Connects to `rpc_url` with the alloy HTTP client.
	///
	/// # Arguments
	///
	/// * `rpc_url` - HTTP or HTTPS endpoint of the node
	/// * `timeout` - Bound applied to the connection check and every later call
	///
	/// # Errors
	///
	/// Returns `DeliveryError::Connection` when the URL is malformed or the
	/// node rejects the connection check, and `DeliveryError::Timeout` when
	/// it does not answer within `timeout`.
	pub async fn connect(rpc_url: &str, timeout: Duration) -> Result<Self, DeliveryError> {
		let client = tokio::time::timeout(timeout, AlloyChainClient::connect(rpc_url))
			.await
			.map_err(|_| {
				DeliveryError::Connection(format!(
					"Node did not respond within {}ms",
					timeout.as_millis()
				))
			})??;

		Ok(Self::new(Arc::new(client), timeout))
	}

	pub async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.bounded("eth_chainId", self.client.chain_id()).await
	}

	pub async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.bounded("eth_gasPrice", self.client.gas_price()).await
	}

	pub async fn transaction_count(&self, address: Address) -> Result<u64, DeliveryError> {
		self.bounded(
			"eth_getTransactionCount",
			self.client.transaction_count(address),
		)
		.await
	}

	/// Submits a signed transaction exactly once.
	pub async fn submit(&self, raw: &[u8]) -> Result<TransactionHash, DeliveryError> {
		let hash = self
			.bounded(
				"eth_sendRawTransaction",
				self.client.send_raw_transaction(raw),
			)
			.await?;
		tracing::debug!(tx_hash = %hash, "Node accepted transaction");
		Ok(hash)
	}

	async fn bounded<T>(
		&self,
		operation: &'static str,
		call: impl Future<Output = Result<T, DeliveryError>>,
	) -> Result<T, DeliveryError> {
		match tokio::time::timeout(self.timeout, call).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "RPC call timed out");
				Err(DeliveryError::Timeout {
					operation,
					after: self.timeout,
				})
			}
		}
	}
}
