//! Configuration builder for creating test and development configurations.
//!
//! Builds a `Config` with the same defaults the TOML loader applies, without
//! going through a file.

use crate::{ClientConfig, Config, RetryConfig, TransportConfig, WaitConfig};

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	config: Config,
}

impl ConfigBuilder {
	/// Creates a builder for a client talking directly to `server_url`.
	pub fn new(server_url: impl Into<String>) -> Self {
		Self {
			config: Config {
				client: ClientConfig {
					server_url: server_url.into(),
					connect_timeout_secs: 5,
					request_timeout_secs: 30,
					user_agent: format!("ledger-rpc-client/{}", env!("CARGO_PKG_VERSION")),
				},
				retry: RetryConfig::default(),
				wait: WaitConfig::default(),
				transport: TransportConfig::default(),
			},
		}
	}

	/// Sets the retry policy.
	pub fn retry(mut self, max_attempts: u32, base_delay_ms: u64) -> Self {
		self.config.retry = RetryConfig {
			max_attempts,
			base_delay_ms,
		};
		self
	}

	/// Sets the default wait timeout and poll interval.
	pub fn wait(mut self, timeout_secs: u64, poll_interval_ms: u64) -> Self {
		self.config.wait = WaitConfig {
			timeout_secs,
			poll_interval_ms,
		};
		self
	}

	/// Selects the racing transport with the given backups.
	pub fn racing(mut self, backups: &[&str], fallback: bool) -> Self {
		let mut table = toml::map::Map::new();
		table.insert(
			"backups".to_string(),
			toml::Value::Array(
				backups
					.iter()
					.map(|url| toml::Value::String(url.to_string()))
					.collect(),
			),
		);
		table.insert("fallback".to_string(), toml::Value::Boolean(fallback));

		self.config.transport.primary = "racing".to_string();
		self.config
			.transport
			.implementations
			.insert("racing".to_string(), toml::Value::Table(table));
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		self.config
	}
}
