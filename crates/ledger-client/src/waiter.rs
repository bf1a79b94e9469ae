//! Waiting for a submitted transaction to reach a terminal outcome.
//!
//! The waiter polls a [`TransactionSource`] for the transaction occupying a
//! sender/sequence-number slot until it shows up, the ledger moves past the
//! transaction's expiration, or the caller's timeout runs out.

use crate::ClientError;
use async_trait::async_trait;
use ledger_types::{truncate_id, LedgerState, Transaction};
use std::time::Duration;
use tracing::instrument;

/// Lookups the waiter needs from a client.
#[async_trait]
pub trait TransactionSource: Send + Sync {
	/// Returns the transaction sent by `sender` with `sequence_number`, if
	/// the server has it.
	async fn account_transaction(
		&self,
		sender: &str,
		sequence_number: u64,
	) -> Result<Option<Transaction>, ClientError>;

	/// Returns a copy of the last ledger state the client accepted.
	fn last_known_state(&self) -> LedgerState;
}

/// What to wait for, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
	pub sender: String,
	pub sequence_number: u64,
	pub expiration_time_secs: u64,
	pub expected_hash: String,
	pub timeout: Duration,
	pub poll_interval: Duration,
}

/// States of a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
	Polling,
	Found,
	Expired,
	TimedOut,
}

/// Polls for a transaction on behalf of one caller.
pub struct TransactionWaiter<'a> {
	source: &'a dyn TransactionSource,
}

impl<'a> TransactionWaiter<'a> {
	pub fn new(source: &'a dyn TransactionSource) -> Self {
		Self { source }
	}

	/// Waits until the transaction described by `spec` is found.
	///
	/// Fails with `TransactionHashMismatch` if another transaction occupies
	/// the slot, `TransactionExecutionFailed` if it did not execute,
	/// `TransactionExpired` once the ledger is past its expiration, and
	/// `WaitForTransactionTimeout` when `spec.timeout` runs out. Errors from
	/// the lookup itself are returned as is.
	#[instrument(skip_all, fields(sender = %truncate_id(&spec.sender), sequence_number = spec.sequence_number, hash = %truncate_id(&spec.expected_hash)))]
	pub async fn wait(&self, spec: &WaitSpec) -> Result<Transaction, ClientError> {
		let start_time = tokio::time::Instant::now();
		let mut state = WaitState::Polling;
		let mut polls: u32 = 0;

		while start_time.elapsed() < spec.timeout {
			// Must be read before the lookup.
			let observed = self.source.last_known_state();
			polls += 1;

			let found = self
				.source
				.account_transaction(&spec.sender, spec.sequence_number)
				.await?;

			if let Some(transaction) = found {
				if transaction.hash != spec.expected_hash {
					tracing::warn!(found = %transaction.hash, "Slot taken by another transaction");
					return Err(ClientError::TransactionHashMismatch {
						expected: spec.expected_hash.clone(),
						transaction: Box::new(transaction),
					});
				}
				if !transaction.is_executed() {
					tracing::warn!(vm_status = %transaction.vm_status.status_type, "Transaction failed");
					return Err(ClientError::TransactionExecutionFailed {
						transaction: Box::new(transaction),
					});
				}
				state = transition(state, WaitState::Found);
				tracing::info!(
					version = transaction.version,
					polls,
					elapsed_ms = start_time.elapsed().as_millis() as u64,
					?state,
					"Transaction executed"
				);
				return Ok(transaction);
			}

			if observed.is_past_expiration(spec.expiration_time_secs) {
				state = transition(state, WaitState::Expired);
				tracing::info!(ledger = %observed, polls, ?state, "Transaction expired");
				return Err(ClientError::TransactionExpired {
					expiration_time_secs: spec.expiration_time_secs,
					state: observed,
				});
			}

			tracing::debug!(polls, ledger = %observed, "Transaction not found yet");
			tokio::time::sleep(spec.poll_interval).await;
		}

		state = transition(state, WaitState::TimedOut);
		tracing::info!(polls, ?state, "Gave up waiting for transaction");
		Err(ClientError::WaitForTransactionTimeout {
			sender: spec.sender.clone(),
			sequence_number: spec.sequence_number,
			elapsed: start_time.elapsed(),
		})
	}
}

fn transition(from: WaitState, to: WaitState) -> WaitState {
	tracing::debug!(?from, ?to, "Wait state changed");
	to
}

#[cfg(test)]
mod tests {
	use super::*;
	use ledger_types::{VmStatus, MICROS_PER_SECOND};
	use serde_json::Value;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	const SENDER: &str = "f72589b71ff4f8d139674a3f7369c69b";

	/// Returns scripted lookups. Each lookup advances the ledger clock.
	struct FakeSource {
		state: Mutex<LedgerState>,
		step_micros: i64,
		lookups: Mutex<VecDeque<Option<Transaction>>>,
		calls: Mutex<u32>,
	}

	impl FakeSource {
		fn new(step_micros: i64, lookups: Vec<Option<Transaction>>) -> Self {
			Self {
				state: Mutex::new(LedgerState::new(2, 0, 0)),
				step_micros,
				lookups: Mutex::new(lookups.into()),
				calls: Mutex::new(0),
			}
		}

		fn calls(&self) -> u32 {
			*self.calls.lock().unwrap()
		}
	}

	#[async_trait]
	impl TransactionSource for FakeSource {
		async fn account_transaction(
			&self,
			_sender: &str,
			_sequence_number: u64,
		) -> Result<Option<Transaction>, ClientError> {
			*self.calls.lock().unwrap() += 1;
			{
				let mut state = self.state.lock().unwrap();
				state.version += 1;
				state.timestamp_micros += self.step_micros;
			}
			Ok(self.lookups.lock().unwrap().pop_front().flatten())
		}

		fn last_known_state(&self) -> LedgerState {
			*self.state.lock().unwrap()
		}
	}

	fn transaction(hash: &str, status: &str) -> Transaction {
		Transaction {
			version: 100,
			hash: hash.to_string(),
			vm_status: VmStatus {
				status_type: status.to_string(),
				..Default::default()
			},
			gas_used: 0,
			transaction: Value::Null,
			bytes: None,
			events: vec![],
		}
	}

	fn spec(timeout: Duration, poll_interval: Duration) -> WaitSpec {
		WaitSpec {
			sender: SENDER.to_string(),
			sequence_number: 7,
			expiration_time_secs: 5,
			expected_hash: "aa".to_string(),
			timeout,
			poll_interval,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_expires_once_ledger_passes_expiration() {
		let source = FakeSource::new(MICROS_PER_SECOND, vec![]);

		let err = TransactionWaiter::new(&source)
			.wait(&spec(Duration::from_secs(60), Duration::from_millis(100)))
			.await
			.unwrap_err();

		match err {
			ClientError::TransactionExpired { expiration_time_secs, state } => {
				assert_eq!(expiration_time_secs, 5);
				// The state read before the sixth lookup is exactly 5s.
				assert_eq!(state.timestamp_micros, 5 * MICROS_PER_SECOND);
			},
			other => panic!("unexpected error: {other}"),
		}
		assert_eq!(source.calls(), 6);
	}

	#[tokio::test(start_paused = true)]
	async fn test_hash_mismatch_on_first_poll() {
		let source = FakeSource::new(0, vec![Some(transaction("bb", "executed"))]);

		let err = TransactionWaiter::new(&source)
			.wait(&spec(Duration::from_secs(5), Duration::from_millis(100)))
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ClientError::TransactionHashMismatch { ref expected, ref transaction }
				if expected == "aa" && transaction.hash == "bb"
		));
		assert_eq!(source.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_execution_failed() {
		let source = FakeSource::new(0, vec![None, Some(transaction("aa", "move_abort"))]);

		let err = TransactionWaiter::new(&source)
			.wait(&spec(Duration::from_secs(5), Duration::from_millis(100)))
			.await
			.unwrap_err();

		assert!(matches!(err, ClientError::TransactionExecutionFailed { .. }));
		assert_eq!(source.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_found_after_polling() {
		let source = FakeSource::new(
			100_000,
			vec![None, None, Some(transaction("aa", "executed"))],
		);
		let start = tokio::time::Instant::now();

		let txn = TransactionWaiter::new(&source)
			.wait(&spec(Duration::from_secs(5), Duration::from_millis(100)))
			.await
			.unwrap();

		assert_eq!(txn.hash, "aa");
		assert_eq!(source.calls(), 3);
		assert_eq!(start.elapsed(), Duration::from_millis(200));
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out() {
		let source = FakeSource::new(0, vec![]);

		let err = TransactionWaiter::new(&source)
			.wait(&spec(Duration::from_secs(1), Duration::from_millis(300)))
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ClientError::WaitForTransactionTimeout { sequence_number: 7, .. }
		));
		assert_eq!(source.calls(), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_non_ascii_hash_with_logging_enabled() {
		let subscriber = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::INFO)
			.with_test_writer()
			.finish();
		let _guard = tracing::subscriber::set_default(subscriber);
		let source = FakeSource::new(0, vec![Some(transaction("aéééé", "executed"))]);
		let mut spec = spec(Duration::from_secs(1), Duration::from_millis(100));
		spec.expected_hash = "aéééé".to_string();

		let txn = TransactionWaiter::new(&source).wait(&spec).await.unwrap();
		assert_eq!(txn.hash, "aéééé");
	}

	#[tokio::test(start_paused = true)]
	async fn test_lookup_error_propagates() {
		struct Failing;

		#[async_trait]
		impl TransactionSource for Failing {
			async fn account_transaction(
				&self,
				_sender: &str,
				_sequence_number: u64,
			) -> Result<Option<Transaction>, ClientError> {
				Err(ClientError::InconsistentChain {
					expected: 2,
					actual: 3,
				})
			}

			fn last_known_state(&self) -> LedgerState {
				LedgerState::unknown()
			}
		}

		let err = TransactionWaiter::new(&Failing)
			.wait(&spec(Duration::from_secs(1), Duration::from_millis(100)))
			.await
			.unwrap_err();
		assert!(matches!(err, ClientError::InconsistentChain { .. }));
	}
}
