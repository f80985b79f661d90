//! Zeroizing wrapper for private key material.
//!
//! Both the funded sender key and every generated recipient key live in a
//! [`SecretString`]. The buffer is wiped on drop and never printed through
//! `Debug`, `Display` or `Serialize`. A key leaves the wrapper only through
//! [`SecretString::expose_secret`], [`SecretString::with_exposed`] or
//! [`SecretString::key_bytes`].

use crate::utils::without_0x_prefix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// Length of a secp256k1 private key in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Reasons a secret is not usable as a private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyFormatError {
	#[error("Private key must be hex encoded")]
	NotHex,
	#[error("Private key must be {PRIVATE_KEY_LEN} bytes, got {0}")]
	Length(usize),
}

/// Private key text that is zeroed on drop and redacted in every formatted
/// output.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Renders raw key bytes as `0x` prefixed lowercase hex.
	pub fn from_key_bytes(bytes: &[u8]) -> Self {
		let encoded = Zeroizing::new(hex::encode(bytes));
		Self::new(format!("0x{}", encoded.as_str()))
	}

	/// Decodes the secret as a private key.
	///
	/// Surrounding whitespace and a `0x` or `0X` prefix are accepted.
	///
	/// # Returns
	///
	/// The 32 key bytes in a buffer that is wiped on drop.
	///
	/// # Errors
	///
	/// Returns [`KeyFormatError::NotHex`] for non-hex input and
	/// [`KeyFormatError::Length`] when the decoded key is not 32 bytes.
	pub fn key_bytes(&self) -> Result<Zeroizing<Vec<u8>>, KeyFormatError> {
		let decoded = hex::decode(without_0x_prefix(self.0.trim()))
			.map(Zeroizing::new)
			.map_err(|_| KeyFormatError::NotHex)?;
		if decoded.len() != PRIVATE_KEY_LEN {
			return Err(KeyFormatError::Length(decoded.len()));
		}
		Ok(decoded)
	}

	/// Exposes the secret as a string slice.
	///
	/// # Security Warning
	/// The returned slice is the raw key. Only the final wallet report, shown
	/// on the operator's request, should print it.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Lends the secret to `f` for the duration of the call.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// The saved configuration writes the key through `with_exposed`.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}
