//! Scripted HTTP collaborator for unit tests.

use crate::{HttpError, HttpTransport};
use async_trait::async_trait;
use ledger_types::RpcRequest;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

struct Scripted {
	delay: Duration,
	outcome: Result<String, HttpError>,
}

/// Replays queued responses per URL, optionally after a delay.
#[derive(Default)]
pub(crate) struct ScriptedHttp {
	replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
	requests: Mutex<Vec<(String, RpcRequest)>>,
	completed: AtomicUsize,
}

impl ScriptedHttp {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	fn push(&self, url: &str, delay: Duration, outcome: Result<String, HttpError>) {
		self.replies
			.lock()
			.unwrap()
			.entry(url.to_string())
			.or_default()
			.push_back(Scripted { delay, outcome });
	}

	pub(crate) fn reply(&self, url: &str, body: Value) {
		self.push(url, Duration::ZERO, Ok(body.to_string()));
	}

	pub(crate) fn reply_after(&self, url: &str, delay: Duration, body: Value) {
		self.push(url, delay, Ok(body.to_string()));
	}

	pub(crate) fn reply_raw(&self, url: &str, body: &str) {
		self.push(url, Duration::ZERO, Ok(body.to_string()));
	}

	pub(crate) fn fail(&self, url: &str, status: u16) {
		self.fail_after(url, Duration::ZERO, status);
	}

	pub(crate) fn fail_after(&self, url: &str, delay: Duration, status: u16) {
		self.push(
			url,
			delay,
			Err(HttpError::Status {
				status,
				body: format!("scripted failure from {}", url),
			}),
		);
	}

	/// Returns the (url, method) pairs of every request received so far.
	pub(crate) fn calls(&self) -> Vec<(String, String)> {
		self.requests
			.lock()
			.unwrap()
			.iter()
			.map(|(url, request)| (url.clone(), request.method.clone()))
			.collect()
	}

	/// Returns the params of every request received so far.
	pub(crate) fn params(&self) -> Vec<Vec<Value>> {
		self.requests
			.lock()
			.unwrap()
			.iter()
			.map(|(_, request)| request.params.clone())
			.collect()
	}

	/// Returns how many requests have finished their scripted delay.
	pub(crate) fn completed(&self) -> usize {
		self.completed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl HttpTransport for ScriptedHttp {
	async fn post(&self, url: &str, request: &RpcRequest) -> Result<String, HttpError> {
		self.requests
			.lock()
			.unwrap()
			.push((url.to_string(), request.clone()));
		let next = self
			.replies
			.lock()
			.unwrap()
			.get_mut(url)
			.and_then(|queue| queue.pop_front());

		let Some(scripted) = next else {
			return Err(HttpError::Request(format!("no scripted reply for {}", url)));
		};
		tokio::time::sleep(scripted.delay).await;
		self.completed.fetch_add(1, Ordering::SeqCst);
		scripted.outcome
	}
}

/// Builds a successful JSON-RPC envelope carrying a ledger state.
pub(crate) fn envelope(result: Value, chain_id: i64, version: i64, timestamp_micros: i64) -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"result": result,
		"diem_chain_id": chain_id,
		"diem_ledger_version": version,
		"diem_ledger_timestampusec": timestamp_micros,
	})
}

/// Builds a JSON-RPC error envelope carrying a ledger state.
pub(crate) fn error_envelope(error: Value, chain_id: i64, version: i64, timestamp_micros: i64) -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"error": error,
		"diem_chain_id": chain_id,
		"diem_ledger_version": version,
		"diem_ledger_timestampusec": timestamp_micros,
	})
}
