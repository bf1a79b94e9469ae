//! Typed views of ledger objects returned by the JSON-RPC server.
//!
//! These mirror the server's JSON shapes closely. Unknown fields are ignored
//! and most fields default when absent so that older or newer servers can be
//! read without failing the whole response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// VM status reported for a transaction that executed successfully.
pub const VM_STATUS_EXECUTED: &str = "executed";

/// Account role of a parent VASP account.
pub const ACCOUNT_ROLE_PARENT_VASP: &str = "parent_vasp";

/// Account role of a child VASP account.
pub const ACCOUNT_ROLE_CHILD_VASP: &str = "child_vasp";

/// Execution result of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStatus {
	#[serde(rename = "type")]
	pub status_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub abort_code: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explanation: Option<Value>,
}

impl VmStatus {
	pub fn is_executed(&self) -> bool {
		self.status_type == VM_STATUS_EXECUTED
	}
}

/// Payload of an on-chain event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
	#[serde(rename = "type")]
	pub event_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<Amount>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sender: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub receiver: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(default)]
	pub removed: bool,
}

/// Amount of a given currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
	pub amount: u64,
	pub currency: String,
}

/// An event emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub key: String,
	pub sequence_number: u64,
	pub transaction_version: u64,
	pub data: EventData,
}

/// A committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
	pub version: u64,
	pub hash: String,
	pub vm_status: VmStatus,
	#[serde(default)]
	pub gas_used: u64,
	/// Raw transaction data; its shape depends on the transaction type.
	#[serde(default)]
	pub transaction: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bytes: Option<String>,
	#[serde(default)]
	pub events: Vec<Event>,
}

impl Transaction {
	/// Returns true if the transaction executed successfully.
	pub fn is_executed(&self) -> bool {
		self.vm_status.is_executed()
	}
}

/// Role attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRole {
	#[serde(rename = "type")]
	pub role_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_vasp_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub human_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compliance_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiration_time: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_children: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vasp_domain_events_key: Option<String>,
}

impl AccountRole {
	pub fn is_parent_vasp(&self) -> bool {
		self.role_type == ACCOUNT_ROLE_PARENT_VASP
	}

	pub fn is_child_vasp(&self) -> bool {
		self.role_type == ACCOUNT_ROLE_CHILD_VASP
	}
}

/// On-chain account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
	pub address: String,
	#[serde(default)]
	pub balances: Vec<Amount>,
	pub sequence_number: u64,
	#[serde(default)]
	pub authentication_key: String,
	#[serde(default)]
	pub sent_events_key: String,
	#[serde(default)]
	pub received_events_key: String,
	#[serde(default)]
	pub is_frozen: bool,
	#[serde(default)]
	pub role: AccountRole,
}

/// Ledger metadata at a given version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
	pub version: u64,
	pub timestamp: u64,
	pub chain_id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub script_hash_allow_list: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub module_publishing_allowed: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub diem_version: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub accumulator_root_hash: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dual_attestation_limit: Option<u64>,
}

/// Description of a currency registered on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInfo {
	pub code: String,
	pub scaling_factor: u64,
	pub fractional_part: u64,
	#[serde(default)]
	pub to_xdx_exchange_rate: f64,
	#[serde(default)]
	pub mint_events_key: String,
	#[serde(default)]
	pub burn_events_key: String,
}

/// Proof that the ledger moved from a client's known version to `version`.
///
/// All fields are hex-encoded BCS blobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
	#[serde(default)]
	pub ledger_info_with_signatures: String,
	#[serde(default)]
	pub epoch_change_proof: String,
	#[serde(default)]
	pub ledger_consistency_proof: String,
}

/// Hex-encoded proof components for an account state blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateProof {
	#[serde(default)]
	pub ledger_info_to_transaction_info_proof: String,
	#[serde(default)]
	pub transaction_info: String,
	#[serde(default)]
	pub transaction_info_to_account_proof: String,
}

/// Account state blob at a version, with its proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateWithProof {
	pub version: u64,
	/// Absent when the account does not exist at `version`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub blob: Option<String>,
	#[serde(default)]
	pub proof: AccountStateProof,
}
