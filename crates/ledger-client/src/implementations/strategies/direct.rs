//! Direct transport: every call goes to the primary endpoint only.

use crate::transport::{RequestSender, ServerReply, TransportFactory, TransportStrategy};
use crate::ClientError;
use async_trait::async_trait;
use ledger_types::{ConfigSchema, RpcRequest, Schema, ValidationError};

/// Sends each request to the configured primary endpoint and surfaces its
/// outcome unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Direct;

/// Configuration schema for the direct transport. It takes no settings.
pub struct DirectSchema;

impl ConfigSchema for DirectSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl TransportStrategy for Direct {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DirectSchema)
	}

	async fn send(
		&self,
		sender: &RequestSender,
		primary_url: &str,
		request: &RpcRequest,
		ignore_stale: bool,
	) -> Result<ServerReply, ClientError> {
		sender.send(primary_url, request, ignore_stale).await
	}
}

/// Factory function to create the direct transport from configuration.
pub fn create_transport(config: &toml::Value) -> Result<Box<dyn TransportStrategy>, ClientError> {
	DirectSchema
		.validate(config)
		.map_err(|e| ClientError::Configuration(format!("Invalid direct transport configuration: {}", e)))?;

	Ok(Box::new(Direct))
}

/// Registry for the direct transport implementation.
pub struct Registry;

impl ledger_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "direct";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl crate::transport::TransportRegistry for Registry {}
