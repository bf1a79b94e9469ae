//! Request transport: the per-endpoint pipeline and dispatch strategies.
//!
//! A single call to one endpoint goes through [`RequestSender::send`]: HTTP
//! post, JSON decode, envelope check, and a ledger-state update. A
//! [`TransportStrategy`] decides which endpoints receive the call and how
//! their outcomes are combined.

use crate::{ClientError, LedgerStateTracker};
use async_trait::async_trait;
use ledger_types::{ConfigSchema, ImplementationRegistry, RpcRequest, RpcResponse};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Failures of the HTTP collaborator.
#[derive(Debug, Error)]
pub enum HttpError {
	/// The server answered with a non-2xx status.
	#[error("HTTP status {status}: {body}")]
	Status { status: u16, body: String },
	/// The request could not be sent or the body could not be read.
	#[error("{0}")]
	Request(String),
}

/// HTTP collaborator used to post JSON-RPC requests.
///
/// Implementations return the raw response body for any 2xx status and an
/// [`HttpError`] otherwise.
#[async_trait]
pub trait HttpTransport: Send + Sync {
	async fn post(&self, url: &str, request: &RpcRequest) -> Result<String, HttpError>;
}

/// A decoded response together with the endpoint that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReply {
	pub endpoint: String,
	pub response: RpcResponse,
}

/// Per-endpoint request pipeline.
///
/// Cloning is cheap; clones share the HTTP collaborator and the tracker, so
/// a sender can be moved into a spawned task.
#[derive(Clone)]
pub struct RequestSender {
	http: Arc<dyn HttpTransport>,
	tracker: Arc<LedgerStateTracker>,
}

impl RequestSender {
	pub fn new(http: Arc<dyn HttpTransport>, tracker: Arc<LedgerStateTracker>) -> Self {
		Self { http, tracker }
	}

	/// Sends `request` to `url` and records the ledger state it reports.
	///
	/// The ledger state is checked before the envelope's result or error is
	/// looked at. A stale report fails the call unless `ignore_stale` is set,
	/// in which case it is logged and the response is returned.
	pub async fn send(
		&self,
		url: &str,
		request: &RpcRequest,
		ignore_stale: bool,
	) -> Result<ServerReply, ClientError> {
		tracing::debug!(endpoint = %url, method = %request.method, params = ?request.params, "Sending request");

		let body = self
			.http
			.post(url, request)
			.await
			.map_err(|source| ClientError::Network {
				method: request.method.clone(),
				endpoint: url.to_string(),
				source,
			})?;

		tracing::debug!(endpoint = %url, method = %request.method, body = %body, "Received response");

		let invalid = |message: String| ClientError::InvalidServerResponse {
			method: request.method.clone(),
			endpoint: url.to_string(),
			message,
		};

		let value: Value = serde_json::from_str(&body).map_err(|e| {
			invalid(format!(
				"Parse response as json failed: {}, response: {}",
				e, body
			))
		})?;
		if !value.is_object() {
			return Err(invalid(format!(
				"Response is not a JSON object: {}",
				body
			)));
		}
		let response: RpcResponse = serde_json::from_value(value)
			.map_err(|e| invalid(format!("Malformed JSON-RPC envelope: {}", e)))?;

		if let Some(state) = response.ledger_state() {
			match self.tracker.update(state) {
				Ok(()) => {},
				Err(error) if ignore_stale && error.is_stale() => {
					tracing::debug!(endpoint = %url, method = %request.method, error = %error, "Ignoring stale response");
				},
				Err(error) => return Err(error),
			}
		}

		Ok(ServerReply {
			endpoint: url.to_string(),
			response,
		})
	}
}

/// Strategy for dispatching one logical call across endpoints.
#[async_trait]
pub trait TransportStrategy: Send + Sync {
	/// Returns the configuration schema for this strategy.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Dispatches `request`, using `primary_url` as the primary endpoint.
	async fn send(
		&self,
		sender: &RequestSender,
		primary_url: &str,
		request: &RpcRequest,
		ignore_stale: bool,
	) -> Result<ServerReply, ClientError>;
}

/// Type alias for transport factory functions.
pub type TransportFactory = fn(&toml::Value) -> Result<Box<dyn TransportStrategy>, ClientError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Get all registered transport implementations.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use crate::implementations::strategies::{direct, racing};

	vec![
		(direct::Registry::NAME, direct::Registry::factory()),
		(racing::Registry::NAME, racing::Registry::factory()),
	]
}

/// Builds the transport implementation registered under `name`.
pub fn create_transport(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn TransportStrategy>, ClientError> {
	let factory = get_all_implementations()
		.into_iter()
		.find(|(registered, _)| *registered == name)
		.map(|(_, factory)| factory)
		.ok_or_else(|| ClientError::Configuration(format!("Unknown transport '{}'", name)))?;

	factory(config)
}
