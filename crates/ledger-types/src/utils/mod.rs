//! Utility functions for address and hash formatting.

pub mod formatting;

pub use formatting::{account_address_hex, truncate_id, without_0x_prefix, AddressError};
