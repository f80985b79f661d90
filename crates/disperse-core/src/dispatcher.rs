//! Preflight check and the sequential batch dispatcher.
//!
//! The dispatcher reads the sender's nonce exactly once and derives every
//! later nonce locally. It then walks the recipients in order: build the
//! intent, sign, submit, report, advance the nonce, pause. A failed send is
//! reported and skipped; nothing is retried and nothing is rolled back.
//!
//! Sharing the sender account with another process while a batch runs is
//! unsupported and leads to nonce collisions.

use crate::{CoreError, Operator};
use alloy_primitives::U256;
use async_stream::stream;
use disperse_account::AccountInterface;
use disperse_delivery::DeliveryService;
use disperse_types::{
	Address, GasPolicy, NoncePolicy, TransactionIntent, TransactionOutcome,
};
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::instrument;

/// Verifies the node serves the configured chain.
///
/// On a mismatch the operator decides; declining aborts with
/// [`CoreError::ChainMismatchDeclined`] before any other call is made.
/// Returns the chain id reported by the node.
pub async fn preflight(
	delivery: &DeliveryService,
	configured_chain_id: u64,
	operator: &dyn Operator,
) -> Result<u64, CoreError> {
	let observed = delivery
		.chain_id()
		.await
		.map_err(|e| CoreError::Connection(e.to_string()))?;

	if observed != configured_chain_id {
		tracing::warn!(
			configured = configured_chain_id,
			observed,
			"Configured chain ID does not match the network"
		);
		if !operator
			.confirm_chain_mismatch(configured_chain_id, observed)
			.await
		{
			return Err(CoreError::ChainMismatchDeclined {
				configured: configured_chain_id,
				observed,
			});
		}
		tracing::warn!(
			chain_id = configured_chain_id,
			"Continuing on mismatched network, signing with configured chain ID"
		);
	}

	Ok(observed)
}

/// Fixed parameters of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
	/// Amount sent to each recipient, in wei.
	pub value: U256,
	pub gas: GasPolicy,
	/// Chain id the transactions are signed for.
	pub chain_id: u64,
	/// Pause between two consecutive sends.
	pub delay: Duration,
	pub nonce_policy: NoncePolicy,
}

/// Sends one transfer per recipient in strict nonce order.
pub struct BatchDispatcher {
	delivery: DeliveryService,
	sender: Arc<dyn AccountInterface>,
	settings: DispatchSettings,
	cancel: Option<watch::Receiver<bool>>,
}

impl BatchDispatcher {
	pub fn new(
		delivery: DeliveryService,
		sender: Arc<dyn AccountInterface>,
		settings: DispatchSettings,
	) -> Self {
		Self {
			delivery,
			sender,
			settings,
			cancel: None,
		}
	}

	/// Stops the batch before the next recipient once `cancel` reads `true`.
	///
	/// A send already in flight is never interrupted.
	pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
		self.cancel = Some(cancel);
		self
	}

	/// Builds the transfer intent for one recipient.
	pub fn intent(&self, nonce: u64, to: Address) -> TransactionIntent {
		TransactionIntent {
			nonce,
			to,
			value: self.settings.value,
			gas: self.settings.gas,
			chain_id: self.settings.chain_id,
		}
	}

	/// Reads the nonce baseline and returns the outcome stream.
	///
	/// The stream is lazy: each item is produced right after its send
	/// completes, and the stream consumes the dispatcher, so it can be
	/// driven only once. It yields exactly one outcome per recipient unless
	/// cancelled.
	#[instrument(skip_all, fields(recipients = recipients.len(), chain_id = self.settings.chain_id))]
	pub async fn dispatch(
		self,
		recipients: Vec<Address>,
	) -> Result<impl Stream<Item = TransactionOutcome>, CoreError> {
		let sender = self.sender.address();
		let baseline = self
			.delivery
			.transaction_count(sender)
			.await
			.map_err(|e| CoreError::Nonce(e.to_string()))?;

		tracing::info!(%sender, baseline, "Read nonce baseline");
		Ok(self.into_stream(baseline, recipients))
	}

	fn into_stream(
		self,
		baseline: u64,
		recipients: Vec<Address>,
	) -> impl Stream<Item = TransactionOutcome> {
		stream! {
			let total = recipients.len();
			let mut nonce = baseline;

			for (index, recipient) in recipients.into_iter().enumerate() {
				if self.is_cancelled() {
					tracing::warn!(index, remaining = total - index, "Dispatch cancelled");
					break;
				}

				let outcome = self.send_one(index, nonce, recipient).await;

				// The only place the local nonce moves.
				if outcome.is_sent() || self.settings.nonce_policy == NoncePolicy::AlwaysAdvance {
					nonce += 1;
				}

				yield outcome;

				if index + 1 < total && !self.settings.delay.is_zero() {
					tokio::time::sleep(self.settings.delay).await;
				}
			}
		}
	}

	async fn send_one(&self, index: usize, nonce: u64, recipient: Address) -> TransactionOutcome {
		let intent = self.intent(nonce, recipient);

		let signed = match self.sender.sign_transaction(&intent) {
			Ok(signed) => signed,
			Err(e) => {
				tracing::warn!(index, nonce, %recipient, error = %e, "Signing failed");
				return TransactionOutcome::failed(index, recipient, nonce, e.to_string());
			}
		};

		match self.delivery.submit(&signed.raw).await {
			Ok(hash) => {
				if hash != signed.hash {
					tracing::warn!(expected = %signed.hash, reported = %hash, "Node reported an unexpected transaction hash");
				}
				tracing::info!(index, nonce, %recipient, tx_hash = %hash, "Transaction sent");
				TransactionOutcome::sent(index, recipient, nonce, hash)
			}
			Err(e) => {
				tracing::warn!(index, nonce, %recipient, error = %e, "Transaction failed");
				TransactionOutcome::failed(index, recipient, nonce, e.to_string())
			}
		}
	}

	fn is_cancelled(&self) -> bool {
		self.cancel.as_ref().is_some_and(|cancel| *cancel.borrow())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::{MockNode, ScriptedOperator};
	use disperse_account::LocalAccount;
	use disperse_types::{OutcomeResult, SecretString};
	use futures::StreamExt;
	use std::collections::HashSet;

	const SENDER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const BASELINE: u64 = 41;

	fn settings(nonce_policy: NoncePolicy) -> DispatchSettings {
		DispatchSettings {
			value: U256::from(10_000_000_000_000_000u64),
			gas: GasPolicy::transfer(2_000_000_000),
			chain_id: 31337,
			delay: Duration::from_millis(1000),
			nonce_policy,
		}
	}

	fn dispatcher(node: Arc<MockNode>, settings: DispatchSettings) -> BatchDispatcher {
		let sender = LocalAccount::from_secret(&SecretString::from(SENDER_KEY)).unwrap();
		BatchDispatcher::new(
			DeliveryService::new(node, Duration::from_secs(5)),
			Arc::new(sender),
			settings,
		)
	}

	fn recipients(n: u8) -> Vec<Address> {
		(1..=n).map(Address::repeat_byte).collect()
	}

	async fn run(dispatcher: BatchDispatcher, recipients: Vec<Address>) -> Vec<TransactionOutcome> {
		dispatcher
			.dispatch(recipients)
			.await
			.unwrap()
			.collect::<Vec<_>>()
			.await
	}

	#[tokio::test(start_paused = true)]
	async fn test_all_sends_succeed_with_sequential_nonces() {
		let node = Arc::new(MockNode::new(31337, BASELINE));
		let start = tokio::time::Instant::now();

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance)),
			recipients(3),
		)
		.await;

		assert_eq!(outcomes.len(), 3);
		assert!(outcomes.iter().all(|o| o.is_sent()));
		assert_eq!(
			outcomes.iter().map(|o| o.nonce).collect::<Vec<_>>(),
			vec![BASELINE, BASELINE + 1, BASELINE + 2]
		);
		assert_eq!(
			outcomes.iter().map(|o| o.index).collect::<Vec<_>>(),
			vec![0, 1, 2]
		);

		let hashes: HashSet<_> = outcomes.iter().filter_map(|o| o.tx_hash()).collect();
		assert_eq!(hashes.len(), 3);

		// Two pauses between three sends, none after the last.
		assert!(start.elapsed() >= Duration::from_millis(2000));
		assert!(start.elapsed() < Duration::from_millis(3000));

		let submitted = node.submitted();
		assert_eq!(
			submitted.iter().map(|tx| tx.nonce).collect::<Vec<_>>(),
			vec![BASELINE, BASELINE + 1, BASELINE + 2]
		);
		assert_eq!(node.count("transaction_count"), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_send_does_not_stop_batch() {
		let node = Arc::new(MockNode::new(31337, BASELINE).rejecting_send(1));

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance)),
			recipients(3),
		)
		.await;

		assert_eq!(outcomes.len(), 3);
		assert!(outcomes[0].is_sent());
		assert!(matches!(
			&outcomes[1].result,
			OutcomeResult::Failed(message) if message.contains("insufficient funds")
		));
		assert!(outcomes[2].is_sent());
		assert_eq!(outcomes[2].nonce, BASELINE + 2);

		assert_eq!(
			node.submitted().iter().map(|tx| tx.nonce).collect::<Vec<_>>(),
			vec![BASELINE, BASELINE + 1, BASELINE + 2]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stalled_send_fails_only_that_recipient() {
		let node = Arc::new(MockNode::new(31337, BASELINE).stalling_send(1));
		let start = tokio::time::Instant::now();

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance)),
			recipients(3),
		)
		.await;

		assert_eq!(outcomes.len(), 3);
		assert!(outcomes[0].is_sent());
		assert_eq!(outcomes[1].nonce, BASELINE + 1);
		assert!(matches!(
			&outcomes[1].result,
			OutcomeResult::Failed(message) if message.contains("eth_sendRawTransaction timed out after 5000ms")
		));
		assert!(outcomes[2].is_sent());
		assert_eq!(outcomes[2].nonce, BASELINE + 2);
		assert_eq!(node.count("send_raw_transaction"), 3);

		// One timeout plus two pauses.
		assert!(start.elapsed() >= Duration::from_secs(7));
	}

	#[tokio::test(start_paused = true)]
	async fn test_advance_on_success_reuses_rejected_nonce() {
		let node = Arc::new(MockNode::new(31337, BASELINE).rejecting_send(1));

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AdvanceOnSuccess)),
			recipients(3),
		)
		.await;

		assert_eq!(
			outcomes.iter().map(|o| o.nonce).collect::<Vec<_>>(),
			vec![BASELINE, BASELINE + 1, BASELINE + 1]
		);
		assert!(!outcomes[1].is_sent());
		assert!(outcomes[2].is_sent());
	}

	#[tokio::test(start_paused = true)]
	async fn test_every_outcome_has_exactly_one_variant() {
		let node = Arc::new(
			MockNode::new(31337, 0)
				.rejecting_send(0)
				.rejecting_send(3),
		);

		let outcomes = run(
			dispatcher(node, settings(NoncePolicy::AlwaysAdvance)),
			recipients(5),
		)
		.await;

		assert_eq!(outcomes.len(), 5);
		for outcome in &outcomes {
			assert!(outcome.tx_hash().is_some() != outcome.error().is_some());
		}
		assert_eq!(outcomes.iter().filter(|o| o.is_sent()).count(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_policy_is_identical_for_every_transaction() {
		let node = Arc::new(MockNode::new(31337, 0));
		let mut settings = settings(NoncePolicy::AlwaysAdvance);
		settings.gas = GasPolicy {
			unit_price: 55_000_000_000,
			gas_limit: 30_000,
		};

		run(dispatcher(node.clone(), settings), recipients(4)).await;

		let submitted = node.submitted();
		assert_eq!(submitted.len(), 4);
		for (tx, to) in submitted.iter().zip(recipients(4)) {
			assert_eq!(tx.gas_price, 55_000_000_000);
			assert_eq!(tx.gas_limit, 30_000);
			assert_eq!(tx.chain_id, Some(31337));
			assert_eq!(tx.value, settings.value);
			assert_eq!(tx.to, to.into());
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_nonce_baseline_failure_sends_nothing() {
		let node = Arc::new(MockNode::new(31337, 0).without_nonce());

		let result = dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance))
			.dispatch(recipients(3))
			.await;

		assert!(matches!(result, Err(CoreError::Nonce(_))));
		assert_eq!(node.count("send_raw_transaction"), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancellation_stops_before_next_recipient() {
		let node = Arc::new(MockNode::new(31337, 0));
		let (cancel_tx, cancel_rx) = watch::channel(false);

		let stream = dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance))
			.with_cancellation(cancel_rx)
			.dispatch(recipients(3))
			.await
			.unwrap();
		futures::pin_mut!(stream);

		let first = stream.next().await.unwrap();
		assert!(first.is_sent());

		cancel_tx.send(true).unwrap();
		assert!(stream.next().await.is_none());
		assert_eq!(node.count("send_raw_transaction"), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_before_dispatch_sends_nothing() {
		let node = Arc::new(MockNode::new(31337, 0));
		let (_cancel_tx, cancel_rx) = watch::channel(true);

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance))
				.with_cancellation(cancel_rx),
			recipients(3),
		)
		.await;

		assert!(outcomes.is_empty());
		assert_eq!(node.count("send_raw_transaction"), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_batch() {
		let node = Arc::new(MockNode::new(31337, 0));
		let start = tokio::time::Instant::now();

		let outcomes = run(
			dispatcher(node.clone(), settings(NoncePolicy::AlwaysAdvance)),
			Vec::new(),
		)
		.await;

		assert!(outcomes.is_empty());
		assert_eq!(start.elapsed(), Duration::ZERO);
		assert_eq!(node.count("send_raw_transaction"), 0);
	}

	#[tokio::test]
	async fn test_preflight_matching_chain() {
		let node = Arc::new(MockNode::new(10, 0));
		let delivery = DeliveryService::new(node.clone(), Duration::from_secs(5));
		let operator = ScriptedOperator::declining_mismatch();

		assert_eq!(preflight(&delivery, 10, &operator).await.unwrap(), 10);
		assert_eq!(operator.mismatch_prompts(), 0);
	}

	#[tokio::test]
	async fn test_preflight_mismatch_declined() {
		let node = Arc::new(MockNode::new(10, 0));
		let delivery = DeliveryService::new(node.clone(), Duration::from_secs(5));
		let operator = ScriptedOperator::declining_mismatch();

		let err = preflight(&delivery, 1, &operator).await.unwrap_err();
		assert!(matches!(
			err,
			CoreError::ChainMismatchDeclined {
				configured: 1,
				observed: 10
			}
		));
		assert_eq!(operator.mismatch_prompts(), 1);
		assert_eq!(node.calls(), vec!["chain_id"]);
	}

	#[tokio::test]
	async fn test_preflight_mismatch_confirmed() {
		let node = Arc::new(MockNode::new(10, 0));
		let delivery = DeliveryService::new(node, Duration::from_secs(5));
		let operator = ScriptedOperator::accepting();

		assert_eq!(preflight(&delivery, 1, &operator).await.unwrap(), 10);
		assert_eq!(operator.mismatch_prompts(), 1);
	}
}
