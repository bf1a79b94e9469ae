//! JSON-RPC 2.0 envelope types.
//!
//! Requests always carry the same id since the client never pipelines calls
//! on a single connection. Responses are decoded loosely: the ledger position
//! fields are optional and `result` is kept as raw JSON so that the caller
//! supplied decoder can turn it into a typed value.

use crate::LedgerState;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Id used for every request.
pub const REQUEST_ID: u64 = 1;

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
	pub jsonrpc: String,
	pub id: u64,
	pub method: String,
	pub params: Vec<Value>,
}

impl RpcRequest {
	pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id: REQUEST_ID,
			method: method.into(),
			params,
		}
	}
}

/// Incoming JSON-RPC response.
///
/// `result` distinguishes an absent field (`None`) from an explicit JSON
/// `null` (`Some(Value::Null)`), which servers use for "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
	#[serde(default)]
	pub jsonrpc: Option<String>,
	#[serde(default)]
	pub id: Option<Value>,
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	#[serde(rename = "diem_chain_id", default)]
	pub chain_id: Option<i64>,
	#[serde(rename = "diem_ledger_version", default)]
	pub ledger_version: Option<i64>,
	#[serde(rename = "diem_ledger_timestampusec", default)]
	pub ledger_timestamp_micros: Option<i64>,
}

/// Body of a response once the envelope has been validated.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcPayload {
	/// The call succeeded; the value may be `null`.
	Result(Value),
	/// The server reported an application error.
	Error(Value),
}

impl RpcResponse {
	/// Returns the ledger position reported by the server.
	///
	/// Only a complete triple counts as a report; a response missing any of
	/// the three fields carries no ledger state.
	pub fn ledger_state(&self) -> Option<LedgerState> {
		match (
			self.chain_id,
			self.ledger_version,
			self.ledger_timestamp_micros,
		) {
			(Some(chain_id), Some(version), Some(timestamp)) => {
				Some(LedgerState::new(chain_id, version, timestamp))
			},
			_ => None,
		}
	}

	/// Returns the error or result carried by the envelope.
	///
	/// An error takes precedence over a result. Returns `None` when the
	/// envelope carries neither, which makes it an invalid JSON-RPC response.
	pub fn payload(&self) -> Option<RpcPayload> {
		if let Some(error) = &self.error {
			return Some(RpcPayload::Error(error.clone()));
		}
		self.result.clone().map(RpcPayload::Result)
	}
}

/// Wraps any present value (including `null`) in `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
	D: Deserializer<'de>,
{
	Value::deserialize(deserializer).map(Some)
}
