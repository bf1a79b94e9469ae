//! Configuration module for the ledger JSON-RPC client.
//!
//! Configuration is a TOML document. Values of the form `${VAR}` or
//! `${VAR:-default}` are replaced by environment variables before parsing,
//! and the parsed configuration is validated before it is handed out.
//!
//! Only the `[client]` section is required; retry, wait and transport
//! settings fall back to defaults.

#[cfg(any(test, feature = "testing"))]
pub mod builders;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Name of the transport implementation that talks to a single endpoint.
pub const DIRECT_TRANSPORT: &str = "direct";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, not the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Primary server and HTTP settings.
	pub client: ClientConfig,
	/// Retry policy applied to read calls.
	#[serde(default)]
	pub retry: RetryConfig,
	/// Defaults for waiting on submitted transactions.
	#[serde(default)]
	pub wait: WaitConfig,
	/// Request dispatch strategy.
	#[serde(default)]
	pub transport: TransportConfig,
}

/// Primary server and HTTP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// URL of the primary JSON-RPC server.
	pub server_url: String,
	/// TCP connect timeout in seconds.
	#[serde(default = "default_connect_timeout_secs")]
	pub connect_timeout_secs: u64,
	/// Whole-request timeout in seconds.
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	/// User-Agent header sent with every request.
	#[serde(default = "default_user_agent")]
	pub user_agent: String,
}

/// Retry policy applied to read calls that hit a stale server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	/// Total number of attempts, including the first one.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Delay unit in milliseconds; attempt n waits n times this value.
	#[serde(default = "default_base_delay_ms")]
	pub base_delay_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			base_delay_ms: default_base_delay_ms(),
		}
	}
}

/// Defaults for waiting on submitted transactions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitConfig {
	/// How long to keep polling before giving up.
	#[serde(default = "default_wait_timeout_secs")]
	pub timeout_secs: u64,
	/// Delay between two polls in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
	fn default() -> Self {
		Self {
			timeout_secs: default_wait_timeout_secs(),
			poll_interval_ms: default_poll_interval_ms(),
		}
	}
}

/// Request dispatch strategy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
	/// Which implementation to use.
	#[serde(default = "default_transport_primary")]
	pub primary: String,
	/// Map of transport implementation names to their configurations.
	/// Each implementation validates its own table.
	#[serde(default = "default_transport_implementations")]
	pub implementations: HashMap<String, toml::Value>,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			primary: default_transport_primary(),
			implementations: default_transport_implementations(),
		}
	}
}

fn default_connect_timeout_secs() -> u64 {
	5
}

fn default_request_timeout_secs() -> u64 {
	30
}

fn default_user_agent() -> String {
	format!("ledger-rpc-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
	10
}

fn default_base_delay_ms() -> u64 {
	100
}

fn default_wait_timeout_secs() -> u64 {
	15
}

fn default_poll_interval_ms() -> u64 {
	100
}

fn default_transport_primary() -> String {
	DIRECT_TRANSPORT.to_string()
}

fn default_transport_implementations() -> HashMap<String, toml::Value> {
	HashMap::from([(
		DIRECT_TRANSPORT.to_string(),
		toml::Value::Table(toml::map::Map::new()),
	)])
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
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

	let mut resolved = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		resolved.push_str(&input[last_end..full_match.start()]);
		resolved.push_str(&value);
		last_end = full_match.end();
	}
	resolved.push_str(&input[last_end..]);

	Ok(resolved)
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read configuration file {}: {}", path, e),
			))
		})?;
		content.parse()
	}

	/// Connect timeout as a duration.
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_secs(self.client.connect_timeout_secs)
	}

	/// Whole-request timeout as a duration.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.client.request_timeout_secs)
	}

	/// Base delay of the retry policy as a duration.
	pub fn retry_base_delay(&self) -> Duration {
		Duration::from_millis(self.retry.base_delay_ms)
	}

	/// Default wait timeout as a duration.
	pub fn wait_timeout(&self) -> Duration {
		Duration::from_secs(self.wait.timeout_secs)
	}

	/// Default poll interval as a duration.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.wait.poll_interval_ms)
	}

	/// Returns the configuration table of the selected transport.
	pub fn primary_transport(&self) -> Option<&toml::Value> {
		self.transport.implementations.get(&self.transport.primary)
	}

	/// Validates the configuration.
	///
	/// Checks the primary server URL, timeouts, the retry policy, and that
	/// the selected transport has a configuration table. Transport specific
	/// settings are validated by the transport implementation itself.
	fn validate(&self) -> Result<(), ConfigError> {
		let url = self.client.server_url.trim();
		if url.is_empty() {
			return Err(ConfigError::Validation(
				"client.server_url cannot be empty".into(),
			));
		}
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"client.server_url must be an http(s) URL, got '{}'",
				url
			)));
		}
		if self.client.connect_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"client.connect_timeout_secs must be greater than 0".into(),
			));
		}
		if self.client.request_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"client.request_timeout_secs must be greater than 0".into(),
			));
		}

		if self.retry.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"retry.max_attempts must be at least 1".into(),
			));
		}

		if self.wait.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"wait.poll_interval_ms must be greater than 0".into(),
			));
		}

		if self.transport.primary.is_empty() {
			return Err(ConfigError::Validation(
				"transport.primary cannot be empty".into(),
			));
		}
		match self.primary_transport() {
			None => {
				return Err(ConfigError::Validation(format!(
					"Primary transport '{}' not found in implementations",
					self.transport.primary
				)))
			},
			Some(value) if !value.is_table() => {
				return Err(ConfigError::Validation(format!(
					"transport.implementations.{} must be a table",
					self.transport.primary
				)))
			},
			Some(_) => {},
		}

		Ok(())
	}
}

/// Parses and validates configuration from a TOML string, resolving
/// environment variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
