//! Tracking of the last ledger position reported by the server.
//!
//! Every response carries the server's chain id, ledger version and ledger
//! timestamp. The tracker accepts a report only if it does not move
//! backwards, so that a client never reads from a replica behind what it
//! has already seen. A change of chain id is reported separately because it
//! means the client is talking to a different network.

use crate::ClientError;
use ledger_types::LedgerState;
use std::sync::{Mutex, PoisonError};

/// Lock-guarded holder of the last accepted [`LedgerState`].
///
/// Each executor owns its own tracker unless one is shared explicitly.
#[derive(Debug, Default)]
pub struct LedgerStateTracker {
	state: Mutex<LedgerState>,
}

impl LedgerStateTracker {
	/// Creates a tracker that has not observed any server yet.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of the last accepted state.
	pub fn read(&self) -> LedgerState {
		*self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Records a state reported by the server.
	///
	/// Fails with [`ClientError::InconsistentChain`] if a chain id is already
	/// known and differs from the reported one, otherwise with
	/// [`ClientError::StaleResponse`] if the reported version or timestamp is
	/// older than the stored one. A rejected report leaves the stored state
	/// untouched.
	pub fn update(&self, received: LedgerState) -> Result<(), ClientError> {
		let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);

		// Identity before freshness: a network switch is never staleness.
		if current.has_chain_id() && current.chain_id != received.chain_id {
			return Err(ClientError::InconsistentChain {
				expected: current.chain_id,
				actual: received.chain_id,
			});
		}

		if received.version < current.version
			|| received.timestamp_micros < current.timestamp_micros
		{
			return Err(ClientError::StaleResponse {
				last_known: *current,
				received,
			});
		}

		*current = received;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, Rng, SeedableRng};
	use std::sync::Arc;

	#[test]
	fn test_first_update_accepted() {
		let tracker = LedgerStateTracker::new();
		assert_eq!(tracker.read(), LedgerState::unknown());

		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();
		assert_eq!(tracker.read(), LedgerState::new(2, 10, 1000));
	}

	#[test]
	fn test_equal_state_accepted() {
		let tracker = LedgerStateTracker::new();
		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();
		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();
		assert_eq!(tracker.read(), LedgerState::new(2, 10, 1000));
	}

	#[test]
	fn test_older_version_rejected() {
		let tracker = LedgerStateTracker::new();
		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();

		let err = tracker.update(LedgerState::new(2, 9, 2000)).unwrap_err();
		assert!(matches!(
			err,
			ClientError::StaleResponse { last_known, received }
				if last_known.version == 10 && received.version == 9
		));
		assert_eq!(tracker.read(), LedgerState::new(2, 10, 1000));
	}

	#[test]
	fn test_older_timestamp_rejected() {
		let tracker = LedgerStateTracker::new();
		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();

		let err = tracker.update(LedgerState::new(2, 11, 999)).unwrap_err();
		assert!(err.is_stale());
		assert_eq!(tracker.read(), LedgerState::new(2, 10, 1000));
	}

	#[test]
	fn test_chain_change_rejected_before_staleness() {
		let tracker = LedgerStateTracker::new();
		tracker.update(LedgerState::new(2, 10, 1000)).unwrap();

		// Older and on another chain: the chain switch wins.
		let err = tracker.update(LedgerState::new(4, 1, 1)).unwrap_err();
		assert!(matches!(
			err,
			ClientError::InconsistentChain {
				expected: 2,
				actual: 4
			}
		));

		// Newer and on another chain is still rejected.
		let err = tracker.update(LedgerState::new(4, 100, 100_000)).unwrap_err();
		assert!(matches!(err, ClientError::InconsistentChain { .. }));
		assert_eq!(tracker.read(), LedgerState::new(2, 10, 1000));
	}

	#[test]
	fn test_random_sequences_never_regress() {
		let mut rng = StdRng::seed_from_u64(7);
		let tracker = LedgerStateTracker::new();
		let mut previous = tracker.read();

		for _ in 0..2_000 {
			let chain_id = if rng.gen_ratio(1, 20) { 3 } else { 2 };
			let received = LedgerState::new(
				chain_id,
				rng.gen_range(0..500),
				rng.gen_range(0..500_000),
			);
			let before = tracker.read();
			let result = tracker.update(received);
			let after = tracker.read();

			match result {
				Ok(()) => assert_eq!(after, received),
				Err(_) => assert_eq!(after, before),
			}
			assert!(after.version >= previous.version);
			assert!(after.timestamp_micros >= previous.timestamp_micros);
			if previous.has_chain_id() {
				assert_eq!(after.chain_id, previous.chain_id);
			}
			previous = after;
		}
	}

	#[test]
	fn test_concurrent_updates_keep_order() {
		let tracker = Arc::new(LedgerStateTracker::new());
		let handles: Vec<_> = (0..8)
			.map(|worker| {
				let tracker = Arc::clone(&tracker);
				std::thread::spawn(move || {
					for i in 0..500_i64 {
						let version = i * 8 + worker;
						let _ = tracker.update(LedgerState::new(2, version, version * 10));
						let seen = tracker.read();
						assert_eq!(seen.timestamp_micros, seen.version * 10);
					}
				})
			})
			.collect();

		for handle in handles {
			handle.join().unwrap();
		}
		assert_eq!(tracker.read().version, 499 * 8 + 7);
	}
}
