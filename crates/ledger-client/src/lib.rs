//! JSON-RPC client for a remote ledger.
//!
//! The client dispatches calls through a pluggable transport strategy,
//! tracks the ledger position reported by every response to reject answers
//! from lagging replicas, retries reads that hit such a replica, and polls
//! for the outcome of submitted transactions.
//!
//! The request path is:
//! `LedgerClient` -> `RequestExecutor` -> `RetryPolicy` ->
//! `TransportStrategy` -> `RequestSender` (HTTP, JSON, `LedgerStateTracker`).

use ledger_types::{AddressError, LedgerState, Transaction};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod decode;
pub mod executor;
pub mod retry;
pub mod state;
pub mod transport;
pub mod waiter;

#[cfg(test)]
pub(crate) mod testing;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod strategies {
		pub mod direct;
		pub mod racing;
	}
}

pub use client::LedgerClient;
pub use decode::ResultDecoder;
pub use executor::RequestExecutor;
pub use retry::RetryPolicy;
pub use state::LedgerStateTracker;
pub use transport::{HttpError, HttpTransport, RequestSender, ServerReply, TransportStrategy};
pub use waiter::{TransactionSource, TransactionWaiter, WaitSpec};

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum ClientError {
	/// The HTTP request could not be completed or returned a non-2xx status.
	#[error("Network error calling {method} on {endpoint}: {source}")]
	Network {
		method: String,
		endpoint: String,
		#[source]
		source: HttpError,
	},
	/// The response is not a JSON-RPC envelope or its result could not be decoded.
	#[error("Invalid server response for {method} from {endpoint}: {message}")]
	InvalidServerResponse {
		method: String,
		endpoint: String,
		message: String,
	},
	/// The server answered with a JSON-RPC error object.
	#[error("JSON-RPC error for {method} from {endpoint}: {error}")]
	JsonRpc {
		method: String,
		endpoint: String,
		error: Value,
	},
	/// The response came from a server behind what this client already observed.
	#[error("Stale response: last known {last_known}, received {received}")]
	StaleResponse {
		last_known: LedgerState,
		received: LedgerState,
	},
	/// The server reported a different chain than earlier responses.
	#[error("Inconsistent chain: last known chain id {expected}, received {actual}")]
	InconsistentChain { expected: i64, actual: i64 },
	/// Another transaction occupies the sender and sequence number slot.
	#[error("Transaction hash mismatch: expected {expected}, found {}", .transaction.hash)]
	TransactionHashMismatch {
		expected: String,
		transaction: Box<Transaction>,
	},
	/// The transaction was committed but did not execute successfully.
	#[error("Transaction {} failed with vm status {}", .transaction.hash, .transaction.vm_status.status_type)]
	TransactionExecutionFailed { transaction: Box<Transaction> },
	/// The ledger moved past the transaction's expiration without including it.
	#[error("Transaction expired at {expiration_time_secs}s, ledger is at {state}")]
	TransactionExpired {
		expiration_time_secs: u64,
		state: LedgerState,
	},
	/// The transaction was not found before the wait timeout.
	#[error("Timed out after {elapsed:?} waiting for transaction {sender}:{sequence_number}")]
	WaitForTransactionTimeout {
		sender: String,
		sequence_number: u64,
		elapsed: Duration,
	},
	/// No account exists at the given address.
	#[error("Account not found by address: {address}")]
	AccountNotFound { address: String },
	/// The account exists but is neither a parent nor a child VASP.
	#[error("Account {address} is not a VASP account (role: {role})")]
	NotVaspAccount { address: String, role: String },
	/// No account on the parent chain carries a base URL and compliance key.
	#[error("Could not find base_url and compliance_key from account {address}")]
	ComplianceKeyNotFound { address: String },
	/// Following parent accounts did not terminate within the allowed depth.
	#[error("Account chain starting at {address} exceeds {max_depth} hops")]
	AccountChainTooDeep { address: String, max_depth: usize },
	/// The given account address is malformed.
	#[error(transparent)]
	InvalidAddress(#[from] AddressError),
	/// The client could not be built from its configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Fieldless classification of [`ClientError`], used to configure retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Network,
	InvalidServerResponse,
	JsonRpc,
	StaleResponse,
	InconsistentChain,
	TransactionHashMismatch,
	TransactionExecutionFailed,
	TransactionExpired,
	WaitForTransactionTimeout,
	AccountNotFound,
	NotVaspAccount,
	ComplianceKeyNotFound,
	AccountChainTooDeep,
	InvalidAddress,
	Configuration,
}

impl ClientError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			ClientError::Network { .. } => ErrorKind::Network,
			ClientError::InvalidServerResponse { .. } => ErrorKind::InvalidServerResponse,
			ClientError::JsonRpc { .. } => ErrorKind::JsonRpc,
			ClientError::StaleResponse { .. } => ErrorKind::StaleResponse,
			ClientError::InconsistentChain { .. } => ErrorKind::InconsistentChain,
			ClientError::TransactionHashMismatch { .. } => ErrorKind::TransactionHashMismatch,
			ClientError::TransactionExecutionFailed { .. } => {
				ErrorKind::TransactionExecutionFailed
			},
			ClientError::TransactionExpired { .. } => ErrorKind::TransactionExpired,
			ClientError::WaitForTransactionTimeout { .. } => ErrorKind::WaitForTransactionTimeout,
			ClientError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
			ClientError::NotVaspAccount { .. } => ErrorKind::NotVaspAccount,
			ClientError::ComplianceKeyNotFound { .. } => ErrorKind::ComplianceKeyNotFound,
			ClientError::AccountChainTooDeep { .. } => ErrorKind::AccountChainTooDeep,
			ClientError::InvalidAddress(_) => ErrorKind::InvalidAddress,
			ClientError::Configuration(_) => ErrorKind::Configuration,
		}
	}

	/// Returns true if the error reports a response from a lagging server.
	pub fn is_stale(&self) -> bool {
		self.kind() == ErrorKind::StaleResponse
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_kind_and_context() {
		let err = ClientError::StaleResponse {
			last_known: LedgerState::new(2, 10, 1000),
			received: LedgerState::new(2, 9, 900),
		};
		assert!(err.is_stale());
		let message = err.to_string();
		assert!(message.contains("version=10"));
		assert!(message.contains("version=9"));

		let err = ClientError::Network {
			method: "get_account".to_string(),
			endpoint: "http://primary".to_string(),
			source: HttpError::Status {
				status: 503,
				body: "unavailable".to_string(),
			},
		};
		assert_eq!(err.kind(), ErrorKind::Network);
		assert!(err.to_string().contains("get_account"));
		assert!(err.to_string().contains("503"));
	}
}
