//! Typed JSON-RPC method catalogue.
//!
//! Each method builds its params, picks a decoder and hands the call to the
//! [`RequestExecutor`]. Read calls are retried on stale responses; `submit`
//! is sent exactly once.

use crate::decode;
use crate::implementations::http::ReqwestTransport;
use crate::transport::{self, HttpTransport};
use crate::waiter::{TransactionSource, TransactionWaiter, WaitSpec};
use crate::{ClientError, RequestExecutor, RetryPolicy};
use async_trait::async_trait;
use ledger_config::Config;
use ledger_types::{
	account_address_hex, without_0x_prefix, Account, AccountStateWithProof, CurrencyInfo, Event,
	LedgerState, Metadata, StateProof, Transaction,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of accounts visited when following parent VASP links.
pub const MAX_ACCOUNT_CHAIN_DEPTH: usize = 4;

/// Account holding the VASP domain event stream.
pub const TREASURY_ADDRESS: &str = "0000000000000000000000000b1e55ed";

/// Default page size when reading the VASP domain event stream.
pub const DEFAULT_EVENT_BATCH_SIZE: u64 = 100;

/// Default time to wait for a transaction.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default delay between two transaction lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Client for the ledger's JSON-RPC API.
pub struct LedgerClient {
	executor: RequestExecutor,
	wait_timeout: Duration,
	poll_interval: Duration,
}

impl LedgerClient {
	pub fn new(executor: RequestExecutor) -> Self {
		Self {
			executor,
			wait_timeout: DEFAULT_WAIT_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	/// Overrides the defaults used by [`LedgerClient::wait_for_transaction`].
	pub fn with_wait_defaults(mut self, timeout: Duration, poll_interval: Duration) -> Self {
		self.wait_timeout = timeout;
		self.poll_interval = poll_interval;
		self
	}

	/// Builds a client talking HTTP through `reqwest`.
	pub fn from_config(config: &Config) -> Result<Self, ClientError> {
		let http = ReqwestTransport::new(
			config.connect_timeout(),
			config.request_timeout(),
			&config.client.user_agent,
		)?;
		Self::from_config_with_http(config, Arc::new(http))
	}

	/// Builds a client from configuration with the given HTTP collaborator.
	pub fn from_config_with_http(
		config: &Config,
		http: Arc<dyn HttpTransport>,
	) -> Result<Self, ClientError> {
		let name = &config.transport.primary;
		let transport_config = config.primary_transport().ok_or_else(|| {
			ClientError::Configuration(format!("Transport '{}' is not configured", name))
		})?;
		let strategy = transport::create_transport(name, transport_config)?;
		let retry = RetryPolicy::stale_responses(config.retry.max_attempts, config.retry_base_delay());

		tracing::info!(
			server_url = %config.client.server_url,
			transport = %name,
			max_attempts = retry.max_attempts(),
			"Created ledger client"
		);

		let executor = RequestExecutor::new(config.client.server_url.clone(), http, strategy, retry);
		Ok(Self::new(executor).with_wait_defaults(config.wait_timeout(), config.poll_interval()))
	}

	pub fn executor(&self) -> &RequestExecutor {
		&self.executor
	}

	/// Returns the last ledger state accepted from any server.
	pub fn get_last_known_state(&self) -> LedgerState {
		self.executor.last_known_state()
	}

	/// Returns ledger metadata, at `version` if given, otherwise at the latest version.
	pub async fn get_metadata(&self, version: Option<u64>) -> Result<Metadata, ClientError> {
		let params = version.map(|v| vec![json!(v)]).unwrap_or_default();
		self.executor
			.execute_with_retry("get_metadata", params, &decode::value::<Metadata>)
			.await
	}

	pub async fn get_currencies(&self) -> Result<Vec<CurrencyInfo>, ClientError> {
		self.executor
			.execute_with_retry("get_currencies", vec![], &decode::list::<CurrencyInfo>)
			.await
	}

	/// Returns the account at `address`, or `None` if there is none.
	pub async fn get_account(&self, address: &str) -> Result<Option<Account>, ClientError> {
		let address = account_address_hex(address)?;
		self.executor
			.execute_with_retry("get_account", vec![json!(address)], &decode::object::<Account>)
			.await
	}

	/// Like [`LedgerClient::get_account`] but fails with `AccountNotFound`.
	pub async fn must_get_account(&self, address: &str) -> Result<Account, ClientError> {
		match self.get_account(address).await? {
			Some(account) => Ok(account),
			None => Err(ClientError::AccountNotFound {
				address: account_address_hex(address)?,
			}),
		}
	}

	/// Returns the on-chain sequence number of the account at `address`.
	pub async fn get_account_sequence(&self, address: &str) -> Result<u64, ClientError> {
		Ok(self.must_get_account(address).await?.sequence_number)
	}

	pub async fn get_account_transaction(
		&self,
		address: &str,
		sequence_number: u64,
		include_events: bool,
	) -> Result<Option<Transaction>, ClientError> {
		let address = account_address_hex(address)?;
		self.executor
			.execute_with_retry(
				"get_account_transaction",
				vec![json!(address), json!(sequence_number), json!(include_events)],
				&decode::object::<Transaction>,
			)
			.await
	}

	pub async fn get_account_transactions(
		&self,
		address: &str,
		sequence_number: u64,
		limit: u64,
		include_events: bool,
	) -> Result<Vec<Transaction>, ClientError> {
		let address = account_address_hex(address)?;
		self.executor
			.execute_with_retry(
				"get_account_transactions",
				vec![
					json!(address),
					json!(sequence_number),
					json!(limit),
					json!(include_events),
				],
				&decode::list::<Transaction>,
			)
			.await
	}

	pub async fn get_transactions(
		&self,
		start_version: u64,
		limit: u64,
		include_events: bool,
	) -> Result<Vec<Transaction>, ClientError> {
		self.executor
			.execute_with_retry(
				"get_transactions",
				vec![json!(start_version), json!(limit), json!(include_events)],
				&decode::list::<Transaction>,
			)
			.await
	}

	pub async fn get_events(
		&self,
		event_stream_key: &str,
		start: u64,
		limit: u64,
	) -> Result<Vec<Event>, ClientError> {
		self.executor
			.execute_with_retry(
				"get_events",
				vec![json!(event_stream_key), json!(start), json!(limit)],
				&decode::list::<Event>,
			)
			.await
	}

	/// Returns the proof that the ledger advanced from `version` to the
	/// server's latest version.
	pub async fn get_state_proof(&self, version: u64) -> Result<StateProof, ClientError> {
		self.executor
			.execute_with_retry("get_state_proof", vec![json!(version)], &decode::value::<StateProof>)
			.await
	}

	/// Returns the account state blob at `version` with its proof against
	/// `ledger_version`. The server picks its latest version for any that is
	/// `None`.
	pub async fn get_account_state_with_proof(
		&self,
		address: &str,
		version: Option<u64>,
		ledger_version: Option<u64>,
	) -> Result<AccountStateWithProof, ClientError> {
		let address = account_address_hex(address)?;
		self.executor
			.execute_with_retry(
				"get_account_state_with_proof",
				vec![json!(address), json!(version), json!(ledger_version)],
				&decode::value::<AccountStateWithProof>,
			)
			.await
	}

	/// Submits a hex-encoded signed transaction.
	///
	/// The call is sent once and never retried. A stale response is accepted,
	/// since the server may already have applied the transaction and
	/// resubmitting it would be rejected for an unrelated reason.
	pub async fn submit(&self, signed_transaction_hex: &str) -> Result<(), ClientError> {
		let payload = without_0x_prefix(signed_transaction_hex.trim());
		self.executor
			.execute_once("submit", vec![json!(payload)], &decode::ignore, true)
			.await
	}

	/// Waits for the transaction sent by `sender` with `sequence_number`.
	///
	/// `timeout` and `poll_interval` default to the client's wait settings.
	/// `expected_hash` is compared case-insensitively, with or without "0x".
	pub async fn wait_for_transaction(
		&self,
		sender: &str,
		sequence_number: u64,
		expiration_time_secs: u64,
		expected_hash: &str,
		timeout: Option<Duration>,
		poll_interval: Option<Duration>,
	) -> Result<Transaction, ClientError> {
		let spec = WaitSpec {
			sender: account_address_hex(sender)?,
			sequence_number,
			expiration_time_secs,
			expected_hash: without_0x_prefix(expected_hash.trim()).to_lowercase(),
			timeout: timeout.unwrap_or(self.wait_timeout),
			poll_interval: poll_interval.unwrap_or(self.poll_interval),
		};
		TransactionWaiter::new(self).wait(&spec).await
	}

	/// Returns the parent VASP account of a parent or child VASP account.
	pub async fn get_parent_vasp_account(&self, address: &str) -> Result<Account, ClientError> {
		let start = account_address_hex(address)?;
		let mut current = start.clone();

		for _ in 0..MAX_ACCOUNT_CHAIN_DEPTH {
			let account = self.must_get_account(&current).await?;
			if account.role.is_parent_vasp() {
				return Ok(account);
			}
			if !account.role.is_child_vasp() {
				return Err(ClientError::NotVaspAccount {
					address: account_address_hex(&current)?,
					role: account.role.role_type,
				});
			}
			current = account.role.parent_vasp_address.ok_or_else(|| {
				ClientError::InvalidServerResponse {
					method: "get_account".to_string(),
					endpoint: self.executor.server_url().to_string(),
					message: format!("child VASP account {} has no parent_vasp_address", current),
				}
			})?;
		}

		Err(ClientError::AccountChainTooDeep {
			address: start,
			max_depth: MAX_ACCOUNT_CHAIN_DEPTH,
		})
	}

	/// Returns the base URL and hex-encoded compliance key used for off-chain
	/// communication with the VASP owning `address`.
	///
	/// The first account on the parent chain that has both set wins.
	pub async fn get_base_url_and_compliance_key(
		&self,
		address: &str,
	) -> Result<(String, String), ClientError> {
		let start = account_address_hex(address)?;
		let mut current = start.clone();

		for _ in 0..MAX_ACCOUNT_CHAIN_DEPTH {
			let role = self.must_get_account(&current).await?.role;
			let base_url = role.base_url.filter(|s| !s.is_empty());
			let compliance_key = role.compliance_key.filter(|s| !s.is_empty());
			if let (Some(base_url), Some(compliance_key)) = (base_url, compliance_key) {
				return Ok((base_url, compliance_key));
			}
			match role.parent_vasp_address.filter(|s| !s.is_empty()) {
				Some(parent) => current = parent,
				None => return Err(ClientError::ComplianceKeyNotFound { address: current }),
			}
		}

		Err(ClientError::AccountChainTooDeep {
			address: start,
			max_depth: MAX_ACCOUNT_CHAIN_DEPTH,
		})
	}

	/// Returns true if the treasury account publishes VASP domain events.
	pub async fn supports_vasp_domains(&self) -> Result<bool, ClientError> {
		let treasury = self.must_get_account(TREASURY_ADDRESS).await?;
		Ok(treasury
			.role
			.vasp_domain_events_key
			.is_some_and(|key| !key.is_empty()))
	}

	/// Replays the VASP domain event stream into a domain to address map.
	pub async fn get_vasp_domain_map(
		&self,
		batch_size: u64,
	) -> Result<HashMap<String, String>, ClientError> {
		let batch_size = batch_size.max(1);
		let treasury = self.must_get_account(TREASURY_ADDRESS).await?;
		let key = treasury.role.vasp_domain_events_key.unwrap_or_default();

		let mut domains = HashMap::new();
		let mut start = 0;
		loop {
			let events = self.get_events(&key, start, batch_size).await?;
			for event in &events {
				let Some(domain) = event.data.domain.clone() else {
					continue;
				};
				if event.data.removed {
					domains.remove(&domain);
				} else if let Some(address) = event.data.address.clone() {
					domains.insert(domain, address);
				}
			}
			if (events.len() as u64) < batch_size {
				break;
			}
			start += batch_size;
		}

		tracing::debug!(domains = domains.len(), "Loaded VASP domain map");
		Ok(domains)
	}
}

#[async_trait]
impl TransactionSource for LedgerClient {
	async fn account_transaction(
		&self,
		sender: &str,
		sequence_number: u64,
	) -> Result<Option<Transaction>, ClientError> {
		self.get_account_transaction(sender, sequence_number, true)
			.await
	}

	fn last_known_state(&self) -> LedgerState {
		self.get_last_known_state()
	}
}
