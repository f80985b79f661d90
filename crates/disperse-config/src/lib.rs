//! Configuration module for the disperse batch sender.
//!
//! The configuration file holds the network the batch is sent on and the
//! dispatch tuning knobs. It is plain TOML:
//!
//! ```toml
//! [network]
//! rpc_url = "https://rpc.example"
//! chain_id = 1
//! private_key = "${DISPERSE_PRIVATE_KEY}"
//! explorer_url = "https://etherscan.io/tx/"
//!
//! [dispatch]
//! delay_ms = 1000
//! rpc_timeout_seconds = 30
//! nonce_policy = "always_advance"
//! ```
//!
//! `${VAR}` and `${VAR:-default}` references are substituted from the
//! environment before parsing.
//!
//! ## Trust boundary
//!
//! [`Config::save`] writes the sender private key to disk in cleartext. The
//! operator accepts that by choosing to persist a configuration; referencing
//! an environment variable instead keeps the key out of the file.

use disperse_types::{NetworkConfig, NoncePolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing or writing TOML.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top level configuration of a disperse run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
	/// Network and sender identity.
	pub network: NetworkConfig,
	/// Dispatch loop settings.
	#[serde(default)]
	pub dispatch: DispatchConfig,
}

/// Settings of the sequential dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchConfig {
	/// Pause between two consecutive sends, in milliseconds.
	#[serde(default = "default_delay_ms")]
	pub delay_ms: u64,
	/// Upper bound for every single RPC call, in seconds.
	#[serde(default = "default_rpc_timeout_seconds")]
	pub rpc_timeout_seconds: u64,
	/// Whether a failed send still consumes a nonce locally.
	#[serde(default)]
	pub nonce_policy: NoncePolicy,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			delay_ms: default_delay_ms(),
			rpc_timeout_seconds: default_rpc_timeout_seconds(),
			nonce_policy: NoncePolicy::default(),
		}
	}
}

impl DispatchConfig {
	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.delay_ms)
	}

	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_secs(self.rpc_timeout_seconds)
	}
}

/// Returns the default delay between sends.
///
/// One second keeps public endpoints from rate limiting a batch.
fn default_delay_ms() -> u64 {
	1000
}

/// Returns the default per-call RPC timeout in seconds.
fn default_rpc_timeout_seconds() -> u64 {
	30
}

/// Longest per-call RPC timeout accepted, in seconds.
const MAX_RPC_TIMEOUT_SECONDS: u64 = 600;

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

/// Serialized view of [`Config`] that carries the real private key.
#[derive(Serialize)]
struct PersistedConfig<'a> {
	network: PersistedNetwork<'a>,
	dispatch: &'a DispatchConfig,
}

#[derive(Serialize)]
struct PersistedNetwork<'a> {
	rpc_url: &'a str,
	chain_id: u64,
	private_key: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	explorer_url: Option<&'a str>,
}

impl Config {
	/// Creates a configuration with default dispatch settings.
	pub fn new(network: NetworkConfig) -> Self {
		Self {
			network,
			dispatch: DispatchConfig::default(),
		}
	}

	/// Loads and validates the configuration at `path`.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Loads a previously saved configuration.
	///
	/// # Returns
	///
	/// `None` when nothing is saved at `path`, otherwise the parsed and
	/// validated configuration.
	///
	/// # Errors
	///
	/// Returns `ConfigError::Io` if the file cannot be read, and
	/// `ConfigError::Parse` or `ConfigError::Validation` if its content is
	/// not a usable configuration.
	pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
		let path = path.as_ref();
		if !tokio::fs::try_exists(path).await? {
			tracing::debug!(path = %path.display(), "No saved configuration");
			return Ok(None);
		}
		Self::from_file(path).await.map(Some)
	}

	/// Writes the configuration, private key included, to `path`.
	///
	/// On Unix the file is restricted to the owner.
	pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
		let path = path.as_ref();
		self.validate()?;

		let rendered = self.network.private_key.with_exposed(|key| {
			let persisted = PersistedConfig {
				network: PersistedNetwork {
					rpc_url: &self.network.rpc_url,
					chain_id: self.network.chain_id,
					private_key: key,
					explorer_url: self.network.explorer_url.as_deref(),
				},
				dispatch: &self.dispatch,
			};
			toml::to_string(&persisted)
				.map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
		})?;

		tokio::fs::write(path, rendered).await?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
		}

		tracing::info!(path = %path.display(), "Saved configuration");
		Ok(())
	}

	/// Validates the configuration.
	///
	/// Checks that:
	/// - the RPC URL is an http(s) URL
	/// - the chain id is non-zero
	/// - the private key is 32 bytes of hex
	/// - the RPC timeout is within 1..=600 seconds
	pub fn validate(&self) -> Result<(), ConfigError> {
		let rpc_url = self.network.rpc_url.trim();
		if rpc_url.is_empty() {
			return Err(ConfigError::Validation("RPC URL cannot be empty".into()));
		}
		if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
			return Err(ConfigError::Validation(format!(
				"RPC URL must start with http:// or https://, got '{}'",
				rpc_url
			)));
		}

		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation("Chain ID must be non-zero".into()));
		}

		self.network
			.private_key
			.key_bytes()
			.map_err(|e| ConfigError::Validation(e.to_string()))?;

		if self.dispatch.rpc_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"rpc_timeout_seconds must be at least 1".into(),
			));
		}
		if self.dispatch.rpc_timeout_seconds > MAX_RPC_TIMEOUT_SECONDS {
			return Err(ConfigError::Validation(format!(
				"rpc_timeout_seconds cannot exceed {}",
				MAX_RPC_TIMEOUT_SECONDS
			)));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use disperse_types::SecretString;
	use tempfile::TempDir;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn network() -> NetworkConfig {
		NetworkConfig {
			rpc_url: "http://localhost:8545".to_string(),
			chain_id: 31337,
			private_key: SecretString::from(KEY),
			explorer_url: Some("https://explorer.local/tx/".to_string()),
		}
	}

	#[test]
	fn test_parse_with_default_dispatch() {
		let content = format!(
			r#"
[network]
rpc_url = "http://localhost:8545"
chain_id = 31337
private_key = "{}"
"#,
			KEY
		);

		let config: Config = content.parse().unwrap();
		assert_eq!(config.network.chain_id, 31337);
		assert_eq!(config.network.explorer_url, None);
		assert_eq!(config.network.private_key.expose_secret(), KEY);
		assert_eq!(config.dispatch, DispatchConfig::default());
		assert_eq!(config.dispatch.delay(), Duration::from_millis(1000));
		assert_eq!(config.dispatch.rpc_timeout(), Duration::from_secs(30));
	}

	#[test]
	fn test_parse_dispatch_section() {
		let content = format!(
			r#"
[network]
rpc_url = "https://rpc.example"
chain_id = 1
private_key = "{}"

[dispatch]
delay_ms = 250
rpc_timeout_seconds = 5
nonce_policy = "advance_on_success"
"#,
			KEY
		);

		let config: Config = content.parse().unwrap();
		assert_eq!(config.dispatch.delay_ms, 250);
		assert_eq!(config.dispatch.rpc_timeout_seconds, 5);
		assert_eq!(config.dispatch.nonce_policy, NoncePolicy::AdvanceOnSuccess);
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("DISPERSE_TEST_SENDER_KEY", KEY);

		let content = r#"
[network]
rpc_url = "${DISPERSE_TEST_RPC_URL:-http://localhost:8545}"
chain_id = 31337
private_key = "${DISPERSE_TEST_SENDER_KEY}"
"#;

		let config: Config = content.parse().unwrap();
		assert_eq!(config.network.rpc_url, "http://localhost:8545");
		assert_eq!(config.network.private_key.expose_secret(), KEY);

		std::env::remove_var("DISPERSE_TEST_SENDER_KEY");
	}

	#[test]
	fn test_missing_env_var_is_rejected() {
		let content = r#"
[network]
rpc_url = "http://localhost:8545"
chain_id = 31337
private_key = "${DISPERSE_TEST_UNSET_VARIABLE}"
"#;

		let err = content.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
		assert!(err.to_string().contains("DISPERSE_TEST_UNSET_VARIABLE"));
	}

	#[test]
	fn test_validation_rejects_bad_values() {
		let mut config = Config::new(network());
		assert!(config.validate().is_ok());

		config.network.rpc_url = "localhost:8545".to_string();
		assert!(config.validate().is_err());

		config = Config::new(network());
		config.network.chain_id = 0;
		assert!(config.validate().is_err());

		config = Config::new(network());
		config.network.private_key = SecretString::from("0x1234");
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("32 bytes"));

		config = Config::new(network());
		config.network.private_key = SecretString::from("not-hex");
		assert_eq!(
			config.validate().unwrap_err().to_string(),
			"Validation error: Private key must be hex encoded"
		);

		config = Config::new(network());
		config.dispatch.rpc_timeout_seconds = 0;
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_regular_serialization_redacts_key() {
		let config = Config::new(network());
		let rendered = toml::to_string(&config).unwrap();
		assert!(rendered.contains("***REDACTED***"));
		assert!(!rendered.contains("ac0974bec39a"));
	}

	#[tokio::test]
	async fn test_save_and_load_round_trip() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("disperse.toml");

		let mut config = Config::new(network());
		config.dispatch.delay_ms = 42;
		config.save(&path).await.unwrap();

		let written = std::fs::read_to_string(&path).unwrap();
		assert!(written.contains(KEY));

		let loaded = Config::load(&path).await.unwrap().expect("config present");
		assert_eq!(loaded, config);

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let mode = std::fs::metadata(&path).unwrap().permissions().mode();
			assert_eq!(mode & 0o777, 0o600);
		}
	}

	#[tokio::test]
	async fn test_load_missing_file_returns_none() {
		let temp_dir = TempDir::new().unwrap();
		let loaded = Config::load(temp_dir.path().join("absent.toml"))
			.await
			.unwrap();
		assert!(loaded.is_none());
	}

	#[tokio::test]
	async fn test_save_refuses_invalid_config() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("disperse.toml");

		let mut config = Config::new(network());
		config.network.chain_id = 0;
		assert!(config.save(&path).await.is_err());
		assert!(!path.exists());
	}
}
