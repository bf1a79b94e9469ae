//! Registry trait for named implementations.
//!
//! Transport strategies are selected by name from configuration. Each
//! implementation module provides a `Registry` type that ties that name to a
//! factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "direct" for `transport.implementations.direct`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
