//! Common types module for the ledger JSON-RPC client.
//!
//! This module defines the data types shared by the client crates: the
//! server's reported ledger position, the JSON-RPC envelope, the typed views
//! of ledger objects returned by the server, and the configuration
//! validation framework used by pluggable transport implementations.

/// JSON-RPC 2.0 request and response envelopes.
pub mod jsonrpc;
/// Ledger position reported by the server on every response.
pub mod ledger;
/// Registry trait for named, self-registering implementations.
pub mod registry;
/// Typed views of accounts, transactions, events and chain metadata.
pub mod transaction;
/// Utility functions for address and hash formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use jsonrpc::*;
pub use ledger::*;
pub use registry::*;
pub use transaction::*;
pub use utils::{account_address_hex, truncate_id, without_0x_prefix, AddressError};
pub use validation::*;
