//! Ledger position types.
//!
//! Every JSON-RPC response carries the chain id, ledger version and ledger
//! timestamp of the server that produced it. The client keeps the most
//! recent of these to detect responses served from a lagging replica.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used for every field of a ledger state that was never observed.
pub const UNKNOWN: i64 = -1;

/// Number of microseconds in a second, the unit of ledger timestamps.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Snapshot of the server's reported ledger position.
///
/// A freshly created client holds [`LedgerState::unknown`], which uses
/// [`UNKNOWN`] for all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerState {
	/// Network identity of the server.
	pub chain_id: i64,
	/// Height of the ledger's append-only transaction log.
	pub version: i64,
	/// Ledger wall-clock timestamp in microseconds.
	pub timestamp_micros: i64,
}

impl LedgerState {
	pub const fn new(chain_id: i64, version: i64, timestamp_micros: i64) -> Self {
		Self {
			chain_id,
			version,
			timestamp_micros,
		}
	}

	/// The state of a client that has not talked to any server yet.
	pub const fn unknown() -> Self {
		Self::new(UNKNOWN, UNKNOWN, UNKNOWN)
	}

	/// Returns true if the chain id has been learned from a server.
	pub fn has_chain_id(&self) -> bool {
		self.chain_id != UNKNOWN
	}

	/// Returns true if the ledger timestamp has reached the given expiration,
	/// expressed in whole seconds.
	pub fn is_past_expiration(&self, expiration_time_secs: u64) -> bool {
		let expiration_micros = i64::try_from(expiration_time_secs)
			.map(|secs| secs.saturating_mul(MICROS_PER_SECOND))
			.unwrap_or(i64::MAX);
		expiration_micros <= self.timestamp_micros
	}
}

impl Default for LedgerState {
	fn default() -> Self {
		Self::unknown()
	}
}

impl fmt::Display for LedgerState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"chain_id={} version={} timestamp_usecs={}",
			self.chain_id, self.version, self.timestamp_micros
		)
	}
}
