//! JSON-RPC call execution.
//!
//! The executor owns the ledger-state tracker and the dispatch strategy of
//! one client. Read calls go through [`RequestExecutor::execute_with_retry`],
//! which retries stale responses; calls that change ledger state go through
//! [`RequestExecutor::execute_once`] with staleness ignored, so they are
//! never sent twice.

use crate::decode::ResultDecoder;
use crate::transport::{HttpTransport, RequestSender, TransportStrategy};
use crate::{ClientError, LedgerStateTracker, RetryPolicy};
use ledger_types::{LedgerState, RpcPayload, RpcRequest};
use serde_json::Value;
use std::sync::Arc;

/// Executes JSON-RPC calls against one primary server.
pub struct RequestExecutor {
	server_url: String,
	sender: RequestSender,
	strategy: Box<dyn TransportStrategy>,
	retry: RetryPolicy,
	tracker: Arc<LedgerStateTracker>,
}

impl RequestExecutor {
	/// Creates an executor with a fresh ledger-state tracker.
	pub fn new(
		server_url: impl Into<String>,
		http: Arc<dyn HttpTransport>,
		strategy: Box<dyn TransportStrategy>,
		retry: RetryPolicy,
	) -> Self {
		Self::with_tracker(
			server_url,
			http,
			strategy,
			retry,
			Arc::new(LedgerStateTracker::new()),
		)
	}

	/// Creates an executor that records ledger state into `tracker`.
	///
	/// Executors sharing a tracker reject each other's stale responses.
	pub fn with_tracker(
		server_url: impl Into<String>,
		http: Arc<dyn HttpTransport>,
		strategy: Box<dyn TransportStrategy>,
		retry: RetryPolicy,
		tracker: Arc<LedgerStateTracker>,
	) -> Self {
		Self {
			server_url: server_url.into(),
			sender: RequestSender::new(http, Arc::clone(&tracker)),
			strategy,
			retry,
			tracker,
		}
	}

	pub fn server_url(&self) -> &str {
		&self.server_url
	}

	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	pub fn tracker(&self) -> &Arc<LedgerStateTracker> {
		&self.tracker
	}

	/// Returns a copy of the last ledger state accepted by this executor.
	pub fn last_known_state(&self) -> LedgerState {
		self.tracker.read()
	}

	/// Sends one call and decodes its result.
	///
	/// With `ignore_staleness` set, a response from a lagging server is
	/// accepted instead of failing with `StaleResponse`. A changed chain id
	/// is never ignored.
	pub async fn execute_once<T, D>(
		&self,
		method: &str,
		params: Vec<Value>,
		decoder: &D,
		ignore_staleness: bool,
	) -> Result<T, ClientError>
	where
		D: ResultDecoder<T> + ?Sized,
	{
		let request = RpcRequest::new(method, params);
		let reply = self
			.strategy
			.send(&self.sender, &self.server_url, &request, ignore_staleness)
			.await?;

		match reply.response.payload() {
			Some(RpcPayload::Error(error)) => {
				tracing::debug!(method, endpoint = %reply.endpoint, error = %error, "Server returned error");
				Err(ClientError::JsonRpc {
					method: method.to_string(),
					endpoint: reply.endpoint,
					error,
				})
			},
			Some(RpcPayload::Result(raw)) => {
				decoder
					.decode(raw)
					.map_err(|e| ClientError::InvalidServerResponse {
						method: method.to_string(),
						endpoint: reply.endpoint.clone(),
						message: format!("parse result failed: {}", e),
					})
			},
			None => Err(ClientError::InvalidServerResponse {
				method: method.to_string(),
				endpoint: reply.endpoint,
				message: "No error or result in response".to_string(),
			}),
		}
	}

	/// Sends a read call, retrying while the answering server is stale.
	pub async fn execute_with_retry<T, D>(
		&self,
		method: &str,
		params: Vec<Value>,
		decoder: &D,
	) -> Result<T, ClientError>
	where
		D: ResultDecoder<T> + ?Sized,
	{
		self.retry
			.execute(|| self.execute_once(method, params.clone(), decoder, false))
			.await
	}
}
