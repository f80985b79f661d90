//! Alloy-based EVM chain client.
//!
//! Talks to a single HTTP JSON-RPC endpoint. The provider has no wallet and
//! no fillers attached: transactions arrive already signed and nonces are
//! managed by the dispatcher.

use crate::{ChainClient, DeliveryError};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_transport_http::Http;
use async_trait::async_trait;
use disperse_types::{Address, TransactionHash};
use std::sync::Arc;

/// Chain client backed by an alloy HTTP provider.
pub struct AlloyChainClient {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
}

impl AlloyChainClient {
	/// Parses `rpc_url`, builds the provider and checks that the node answers
	/// `web3_clientVersion`.
	pub async fn connect(rpc_url: &str) -> Result<Self, DeliveryError> {
		let url: reqwest::Url = rpc_url
			.trim()
			.parse()
			.map_err(|e| DeliveryError::Connection(format!("Invalid RPC URL: {}", e)))?;

		if !matches!(url.scheme(), "http" | "https") {
			return Err(DeliveryError::Connection(format!(
				"Unsupported RPC URL scheme '{}', expected http or https",
				url.scheme()
			)));
		}

		let provider = ProviderBuilder::new().on_http(url);

		let client_version = provider
			.get_client_version()
			.await
			.map_err(|e| DeliveryError::Connection(format!("Node unreachable: {}", e)))?;
		tracing::debug!(%client_version, "Connected to node");

		Ok(Self {
			provider: Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
		})
	}
}

#[async_trait]
impl ChainClient for AlloyChainClient {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| DeliveryError::Rpc(format!("Failed to get chain id: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Rpc(format!("Failed to get gas price: {}", e)))
	}

	async fn transaction_count(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| DeliveryError::Rpc(format!("Failed to get nonce: {}", e)))
	}

	async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TransactionHash, DeliveryError> {
		let pending_tx = self
			.provider
			.send_raw_transaction(raw)
			.await
			.map_err(|e| DeliveryError::Rpc(format!("Failed to send transaction: {}", e)))?;

		Ok(TransactionHash(*pending_tx.tx_hash()))
	}
}
