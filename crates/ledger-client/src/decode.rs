//! Result decoders: turn the raw `result` value of a response into a typed value.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decodes the `result` field of a successful response.
///
/// Implemented for any `Fn(Value) -> Result<T, serde_json::Error>`, so plain
/// functions and closures can be passed where a decoder is expected.
pub trait ResultDecoder<T>: Send + Sync {
	fn decode(&self, raw: Value) -> Result<T, serde_json::Error>;
}

impl<T, F> ResultDecoder<T> for F
where
	F: Fn(Value) -> Result<T, serde_json::Error> + Send + Sync,
{
	fn decode(&self, raw: Value) -> Result<T, serde_json::Error> {
		self(raw)
	}
}

/// Discards the result. Used by calls that only care about success.
pub fn ignore(_raw: Value) -> Result<(), serde_json::Error> {
	Ok(())
}

/// Decodes the result as `T`.
pub fn value<T: DeserializeOwned>(raw: Value) -> Result<T, serde_json::Error> {
	serde_json::from_value(raw)
}

/// Decodes an object that may be absent; `null` becomes `None`.
pub fn object<T: DeserializeOwned>(raw: Value) -> Result<Option<T>, serde_json::Error> {
	match raw {
		Value::Null => Ok(None),
		raw => serde_json::from_value(raw).map(Some),
	}
}

/// Decodes a list; `null` becomes an empty list.
pub fn list<T: DeserializeOwned>(raw: Value) -> Result<Vec<T>, serde_json::Error> {
	match raw {
		Value::Null => Ok(Vec::new()),
		raw => serde_json::from_value(raw),
	}
}
