//! String formatting utilities.
//!
//! Provides hex prefix stripping, account address normalization, and
//! truncation of long identifiers for log output.

use thiserror::Error;

/// Length in bytes of an on-chain account address.
pub const ACCOUNT_ADDRESS_LENGTH: usize = 16;

/// Errors that can occur while normalizing an account address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
	/// The address is not valid hex.
	#[error("Invalid hex in account address '{0}'")]
	InvalidHex(String),
	/// The address has the wrong number of bytes.
	#[error("Account address '{address}' has {actual} bytes, expected {expected}")]
	InvalidLength {
		address: String,
		expected: usize,
		actual: usize,
	},
}

/// Utility function to truncate a hex string for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((end, _)) => format!("{}..", &id[..end]),
		None => id.to_string(),
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Normalizes an account address to the form the server expects.
///
/// Accepts upper or lower case hex with or without a "0x" prefix and returns
/// lower case hex without prefix.
pub fn account_address_hex(address: &str) -> Result<String, AddressError> {
	let bytes = hex::decode(without_0x_prefix(address.trim()))
		.map_err(|_| AddressError::InvalidHex(address.to_string()))?;

	if bytes.len() != ACCOUNT_ADDRESS_LENGTH {
		return Err(AddressError::InvalidLength {
			address: address.to_string(),
			expected: ACCOUNT_ADDRESS_LENGTH,
			actual: bytes.len(),
		});
	}

	Ok(hex::encode(bytes))
}
