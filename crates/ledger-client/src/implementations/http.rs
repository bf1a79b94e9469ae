//! HTTP collaborator backed by `reqwest`.

use crate::transport::{HttpError, HttpTransport};
use crate::ClientError;
use async_trait::async_trait;
use ledger_types::RpcRequest;
use std::time::Duration;

/// Posts JSON-RPC requests over a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
	client: reqwest::Client,
}

impl ReqwestTransport {
	/// Builds a transport with the given connect and whole-request timeouts.
	pub fn new(
		connect_timeout: Duration,
		request_timeout: Duration,
		user_agent: &str,
	) -> Result<Self, ClientError> {
		let client = reqwest::Client::builder()
			.connect_timeout(connect_timeout)
			.timeout(request_timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.user_agent(user_agent)
			.build()
			.map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self { client })
	}
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
	async fn post(&self, url: &str, request: &RpcRequest) -> Result<String, HttpError> {
		let response = self
			.client
			.post(url)
			.json(request)
			.send()
			.await
			.map_err(|e| HttpError::Request(e.to_string()))?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| HttpError::Request(format!("Failed to read response body: {}", e)))?;

		if !status.is_success() {
			return Err(HttpError::Status {
				status: status.as_u16(),
				body,
			});
		}

		Ok(body)
	}
}
