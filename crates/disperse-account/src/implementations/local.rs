//! In-process account backed by a secp256k1 private key.

use crate::{AccountError, AccountInterface, SignedTransaction};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Bytes, TxKind};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use disperse_types::{Address, RecipientAccount, SecretString, TransactionHash, TransactionIntent};

/// Account whose key is held in memory.
///
/// Used for the funded sender (loaded from configuration) and for every
/// generated recipient.
#[derive(Clone)]
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl std::fmt::Debug for LocalAccount {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalAccount")
			.field("address", &self.signer.address())
			.finish_non_exhaustive()
	}
}

impl LocalAccount {
	/// Parses a hex encoded private key, with or without `0x` prefix.
	pub fn from_secret(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.trim()
				.parse()
				.map_err(|_| AccountError::InvalidKey("Invalid private key format".to_string()))
		})?;
		Ok(Self { signer })
	}

	/// Generates a new account from the operating system's CSPRNG.
	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}

	/// Private key as `0x` prefixed hex.
	pub fn private_key(&self) -> SecretString {
		SecretString::from_key_bytes(self.signer.to_bytes().as_slice())
	}

	/// Converts the account into the recipient record reported to the operator.
	pub fn into_recipient(self) -> RecipientAccount {
		RecipientAccount {
			address: self.signer.address(),
			private_key: self.private_key(),
		}
	}
}

impl AccountInterface for LocalAccount {
	fn address(&self) -> Address {
		self.signer.address()
	}

	fn sign_transaction(
		&self,
		intent: &TransactionIntent,
	) -> Result<SignedTransaction, AccountError> {
		// Legacy transaction with EIP-155 replay protection.
		let tx = TxLegacy {
			chain_id: Some(intent.chain_id),
			nonce: intent.nonce,
			gas_price: intent.gas.unit_price,
			gas_limit: intent.gas.gas_limit,
			to: TxKind::Call(intent.to),
			value: intent.value,
			input: Bytes::new(),
		};

		let signature = self
			.signer
			.sign_hash_sync(&tx.signature_hash())
			.map_err(|e| AccountError::Signing(e.to_string()))?;

		let envelope = TxEnvelope::from(tx.into_signed(signature));

		Ok(SignedTransaction {
			hash: TransactionHash(*envelope.tx_hash()),
			raw: envelope.encoded_2718().into(),
		})
	}
}
