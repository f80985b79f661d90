//! In-memory node and scripted operator used by the engine tests.

use crate::{CoreError, GasDecision, Operator};
use alloy_consensus::{TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::keccak256;
use async_trait::async_trait;
use disperse_delivery::{ChainClient, DeliveryError};
use disperse_types::{Address, GasPolicy, TransactionHash};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Node double that records every call and every submitted transaction.
pub(crate) struct MockNode {
	chain_id: u64,
	gas_price: Option<u128>,
	nonce: Option<u64>,
	failing_sends: HashSet<usize>,
	stalling_sends: HashSet<usize>,
	calls: Mutex<Vec<&'static str>>,
	submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockNode {
	pub(crate) fn new(chain_id: u64, nonce: u64) -> Self {
		Self {
			chain_id,
			gas_price: Some(1_000_000_000),
			nonce: Some(nonce),
			failing_sends: HashSet::new(),
			stalling_sends: HashSet::new(),
			calls: Mutex::new(Vec::new()),
			submitted: Mutex::new(Vec::new()),
		}
	}

	pub(crate) fn with_gas_price(mut self, price: u128) -> Self {
		self.gas_price = Some(price);
		self
	}

	pub(crate) fn without_gas_price(mut self) -> Self {
		self.gas_price = None;
		self
	}

	pub(crate) fn without_nonce(mut self) -> Self {
		self.nonce = None;
		self
	}

	/// Rejects the send attempt with the given zero-based position.
	pub(crate) fn rejecting_send(mut self, attempt: usize) -> Self {
		self.failing_sends.insert(attempt);
		self
	}

	/// Never answers the send attempt with the given zero-based position.
	pub(crate) fn stalling_send(mut self, attempt: usize) -> Self {
		self.stalling_sends.insert(attempt);
		self
	}

	pub(crate) fn calls(&self) -> Vec<&'static str> {
		self.calls.lock().unwrap().clone()
	}

	pub(crate) fn count(&self, call: &str) -> usize {
		self.calls().iter().filter(|c| **c == call).count()
	}

	/// Every transaction the node was asked to broadcast, decoded.
	pub(crate) fn submitted(&self) -> Vec<TxLegacy> {
		self.submitted
			.lock()
			.unwrap()
			.iter()
			.map(|raw| match TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap() {
				TxEnvelope::Legacy(signed) => signed.tx().clone(),
				other => panic!("unexpected envelope {:?}", other),
			})
			.collect()
	}

	fn record(&self, call: &'static str) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl ChainClient for MockNode {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.record("chain_id");
		Ok(self.chain_id)
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.record("gas_price");
		self.gas_price
			.ok_or_else(|| DeliveryError::Rpc("method not available".to_string()))
	}

	async fn transaction_count(&self, _address: Address) -> Result<u64, DeliveryError> {
		self.record("transaction_count");
		self.nonce
			.ok_or_else(|| DeliveryError::Rpc("header not found".to_string()))
	}

	async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TransactionHash, DeliveryError> {
		self.record("send_raw_transaction");
		let attempt = {
			let mut submitted = self.submitted.lock().unwrap();
			submitted.push(raw.to_vec());
			submitted.len() - 1
		};

		if self.stalling_sends.contains(&attempt) {
			std::future::pending::<()>().await;
		}
		if self.failing_sends.contains(&attempt) {
			return Err(DeliveryError::Rpc(
				"insufficient funds for gas * price + value".to_string(),
			));
		}
		Ok(TransactionHash(keccak256(raw)))
	}
}

/// Operator double with fixed answers.
pub(crate) struct ScriptedOperator {
	continue_on_mismatch: bool,
	gas: GasDecision,
	mismatch_prompts: AtomicUsize,
	suggested: Mutex<Option<GasPolicy>>,
}

impl ScriptedOperator {
	pub(crate) fn accepting() -> Self {
		Self {
			continue_on_mismatch: true,
			gas: GasDecision::Accept,
			mismatch_prompts: AtomicUsize::new(0),
			suggested: Mutex::new(None),
		}
	}

	pub(crate) fn declining_mismatch() -> Self {
		Self {
			continue_on_mismatch: false,
			..Self::accepting()
		}
	}

	pub(crate) fn with_gas(mut self, decision: GasDecision) -> Self {
		self.gas = decision;
		self
	}

	pub(crate) fn mismatch_prompts(&self) -> usize {
		self.mismatch_prompts.load(Ordering::SeqCst)
	}

	/// Policy the operator was last shown, if any.
	pub(crate) fn suggested(&self) -> Option<GasPolicy> {
		*self.suggested.lock().unwrap()
	}
}

#[async_trait]
impl Operator for ScriptedOperator {
	async fn confirm_chain_mismatch(&self, _configured: u64, _observed: u64) -> bool {
		self.mismatch_prompts.fetch_add(1, Ordering::SeqCst);
		self.continue_on_mismatch
	}

	async fn review_gas_policy(&self, suggested: GasPolicy) -> Result<GasDecision, CoreError> {
		*self.suggested.lock().unwrap() = Some(suggested);
		Ok(self.gas)
	}
}
