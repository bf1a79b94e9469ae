//! Primary/backup racing transport.
//!
//! Each call is sent concurrently to the primary endpoint and to one backup
//! picked uniformly at random. Both legs run the full per-endpoint pipeline,
//! including the ledger-state check, so either may fail as stale.
//!
//! Two ways of combining the legs are supported:
//!
//! - first success (default): return the first leg to succeed; if the first
//!   leg to finish failed, return whatever the other leg produces.
//! - fallback: wait for the primary; use the backup only if the primary failed.
//!
//! A leg that is not needed is detached, never aborted. It runs to
//! completion in the background and its result is dropped.

use crate::transport::{
	HttpError, RequestSender, ServerReply, TransportFactory, TransportStrategy,
};
use crate::ClientError;
use async_trait::async_trait;
use ledger_types::{ConfigSchema, Field, FieldType, RpcRequest, Schema, ValidationError};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default size of the worker pool created by the factory.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Concurrent primary/backup dispatch.
#[derive(Debug, Clone)]
pub struct RacingWithBackups {
	backups: Vec<String>,
	fallback: bool,
	pool: Arc<Semaphore>,
}

/// One in-flight call to a single endpoint.
struct Leg {
	name: &'static str,
	endpoint: String,
	handle: JoinHandle<Result<ServerReply, ClientError>>,
}

impl Leg {
	/// Maps a finished task to the leg's result. A task that panicked or was
	/// aborted counts as a network failure of its endpoint.
	fn settle(
		&self,
		method: &str,
		joined: Result<Result<ServerReply, ClientError>, tokio::task::JoinError>,
	) -> Result<ServerReply, ClientError> {
		joined.unwrap_or_else(|e| {
			Err(ClientError::Network {
				method: method.to_string(),
				endpoint: self.endpoint.clone(),
				source: HttpError::Request(format!("request task failed: {}", e)),
			})
		})
	}

	async fn join(mut self, method: &str) -> Result<ServerReply, ClientError> {
		let joined = (&mut self.handle).await;
		self.settle(method, joined)
	}
}

impl RacingWithBackups {
	/// Creates the strategy.
	///
	/// `pool` bounds how many legs may be in flight at once. It is owned by
	/// the caller, may be shared between strategies and must have permits
	/// available.
	pub fn new(
		backups: Vec<String>,
		fallback: bool,
		pool: Arc<Semaphore>,
	) -> Result<Self, ClientError> {
		if backups.is_empty() {
			return Err(ClientError::Configuration(
				"racing transport requires at least one backup".to_string(),
			));
		}
		if pool.available_permits() == 0 {
			return Err(ClientError::Configuration(
				"racing transport worker pool has no permits".to_string(),
			));
		}
		Ok(Self {
			backups,
			fallback,
			pool,
		})
	}

	fn pick_backup(&self) -> &str {
		let index = rand::thread_rng().gen_range(0..self.backups.len());
		&self.backups[index]
	}

	fn spawn_leg(
		&self,
		name: &'static str,
		sender: &RequestSender,
		endpoint: &str,
		request: &RpcRequest,
		ignore_stale: bool,
	) -> Leg {
		let sender = sender.clone();
		let pool = Arc::clone(&self.pool);
		let url = endpoint.to_string();
		let request = request.clone();

		let handle = tokio::spawn(async move {
			let _permit = pool.acquire_owned().await.map_err(|_| ClientError::Network {
				method: request.method.clone(),
				endpoint: url.clone(),
				source: HttpError::Request("worker pool closed".to_string()),
			})?;
			sender.send(&url, &request, ignore_stale).await
		});

		Leg {
			name,
			endpoint: endpoint.to_string(),
			handle,
		}
	}

	async fn first_success(
		&self,
		method: &str,
		mut primary: Leg,
		mut backup: Leg,
	) -> Result<ServerReply, ClientError> {
		let (first_is_primary, joined) = tokio::select! {
			joined = &mut primary.handle => (true, joined),
			joined = &mut backup.handle => (false, joined),
		};
		let (first, other) = if first_is_primary {
			(primary, backup)
		} else {
			(backup, primary)
		};

		match first.settle(method, joined) {
			Ok(reply) => {
				tracing::debug!(method, winner = first.name, endpoint = %first.endpoint, "First response succeeded");
				// Dropping the handle detaches the other leg.
				drop(other);
				Ok(reply)
			},
			Err(error) => {
				tracing::debug!(method, leg = first.name, endpoint = %first.endpoint, error = %error, "First response failed, waiting for the other");
				other.join(method).await
			},
		}
	}

	async fn fallback_to_backup(
		&self,
		method: &str,
		primary: Leg,
		backup: Leg,
	) -> Result<ServerReply, ClientError> {
		let primary_endpoint = primary.endpoint.clone();
		match primary.join(method).await {
			Ok(reply) => Ok(reply),
			Err(error) => {
				tracing::warn!(method, endpoint = %primary_endpoint, backup = %backup.endpoint, error = %error, "Primary failed, falling back to backup");
				backup.join(method).await
			},
		}
	}
}

/// Configuration schema for the racing transport.
pub struct RacingSchema;

impl RacingSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		RacingSchema.validate(config)
	}
}

impl ConfigSchema for RacingSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![
				Field::new("backups", FieldType::Array(Box::new(FieldType::Url))).with_validator(
					|value| match value.as_array() {
						Some(arr) if arr.is_empty() => Err("backups cannot be empty".to_string()),
						_ => Ok(()),
					},
				),
			],
			// Optional fields
			vec![
				Field::new("fallback", FieldType::Boolean),
				Field::new(
					"max_concurrent_requests",
					FieldType::Integer {
						min: Some(2),
						max: Some(1024),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl TransportStrategy for RacingWithBackups {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RacingSchema)
	}

	async fn send(
		&self,
		sender: &RequestSender,
		primary_url: &str,
		request: &RpcRequest,
		ignore_stale: bool,
	) -> Result<ServerReply, ClientError> {
		let backup_url = self.pick_backup().to_string();
		let primary = self.spawn_leg("primary", sender, primary_url, request, ignore_stale);
		let backup = self.spawn_leg("backup", sender, &backup_url, request, ignore_stale);

		if self.fallback {
			self.fallback_to_backup(&request.method, primary, backup)
				.await
		} else {
			self.first_success(&request.method, primary, backup).await
		}
	}
}

/// Factory function to create the racing transport from configuration.
///
/// # Parameters
/// - `config`: TOML table containing:
///   - `backups` (required): non-empty array of backup URLs
///   - `fallback` (optional): prefer the primary and only fall back on failure
///   - `max_concurrent_requests` (optional): size of the worker pool
pub fn create_transport(config: &toml::Value) -> Result<Box<dyn TransportStrategy>, ClientError> {
	RacingSchema::validate_config(config).map_err(|e| {
		ClientError::Configuration(format!("Invalid racing transport configuration: {}", e))
	})?;

	let backups = config
		.get("backups")
		.and_then(|v| v.as_array())
		.map(|arr| {
			arr.iter()
				.filter_map(|v| v.as_str().map(str::to_string))
				.collect::<Vec<_>>()
		})
		.ok_or_else(|| ClientError::Configuration("backups is required".to_string()))?;

	let fallback = config
		.get("fallback")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);

	let pool_size = config
		.get("max_concurrent_requests")
		.and_then(|v| v.as_integer())
		.map(|n| n as usize)
		.unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS);

	let strategy = RacingWithBackups::new(backups, fallback, Arc::new(Semaphore::new(pool_size)))?;
	Ok(Box::new(strategy))
}

/// Registry for the racing transport implementation.
pub struct Registry;

impl ledger_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "racing";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl crate::transport::TransportRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{envelope, ScriptedHttp};
	use crate::LedgerStateTracker;
	use serde_json::json;
	use std::time::Duration;

	const PRIMARY: &str = "http://primary";
	const BACKUP: &str = "http://backup";

	fn racing(fallback: bool) -> RacingWithBackups {
		RacingWithBackups::new(vec![BACKUP.to_string()], fallback, Arc::new(Semaphore::new(4)))
			.unwrap()
	}

	fn setup() -> (Arc<ScriptedHttp>, RequestSender, Arc<LedgerStateTracker>) {
		let http = Arc::new(ScriptedHttp::new());
		let tracker = Arc::new(LedgerStateTracker::new());
		let sender = RequestSender::new(http.clone(), Arc::clone(&tracker));
		(http, sender, tracker)
	}

	fn request() -> RpcRequest {
		RpcRequest::new("get_metadata", vec![])
	}

	#[tokio::test(start_paused = true)]
	async fn test_first_success_returns_fast_backup() {
		let (http, sender, _) = setup();
		http.fail_after(PRIMARY, Duration::from_millis(50), 500);
		http.reply_after(BACKUP, Duration::from_millis(10), envelope(json!("backup"), 2, 10, 1000));

		let reply = racing(false)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, BACKUP);
		assert_eq!(http.completed(), 1);

		// The losing leg still finishes in the background.
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(http.completed(), 2);
		assert_eq!(reply.response.result, Some(json!("backup")));
	}

	#[tokio::test(start_paused = true)]
	async fn test_first_success_ignores_slow_primary_success() {
		let (http, sender, tracker) = setup();
		http.reply_after(PRIMARY, Duration::from_millis(50), envelope(json!("primary"), 2, 20, 2000));
		http.reply_after(BACKUP, Duration::from_millis(10), envelope(json!("backup"), 2, 10, 1000));

		let reply = racing(false)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, BACKUP);

		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(reply.endpoint, BACKUP);
		// The primary's report is still recorded once it lands.
		assert_eq!(tracker.read().version, 20);
	}

	#[tokio::test(start_paused = true)]
	async fn test_first_success_falls_through_to_second() {
		let (http, sender, _) = setup();
		http.fail_after(BACKUP, Duration::from_millis(10), 503);
		http.reply_after(PRIMARY, Duration::from_millis(50), envelope(json!("primary"), 2, 10, 1000));

		let reply = racing(false)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, PRIMARY);
	}

	#[tokio::test(start_paused = true)]
	async fn test_first_success_both_fail_surfaces_second_failure() {
		let (http, sender, _) = setup();
		http.fail_after(PRIMARY, Duration::from_millis(10), 500);
		http.fail_after(BACKUP, Duration::from_millis(20), 502);

		let err = racing(false)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ClientError::Network { ref endpoint, source: HttpError::Status { status: 502, .. }, .. }
				if endpoint == BACKUP
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_stale_leg_loses_to_fresh_leg() {
		let (http, sender, tracker) = setup();
		tracker.update(ledger_types::LedgerState::new(2, 10, 1000)).unwrap();
		http.reply_after(BACKUP, Duration::from_millis(10), envelope(json!("old"), 2, 5, 500));
		http.reply_after(PRIMARY, Duration::from_millis(30), envelope(json!("new"), 2, 11, 1100));

		let reply = racing(false)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, PRIMARY);
		assert_eq!(tracker.read().version, 11);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fallback_prefers_slow_primary() {
		let (http, sender, _) = setup();
		http.reply_after(PRIMARY, Duration::from_millis(50), envelope(json!("primary"), 2, 10, 1000));
		http.reply_after(BACKUP, Duration::from_millis(10), envelope(json!("backup"), 2, 10, 1000));

		let reply = racing(true)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, PRIMARY);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fallback_uses_backup_when_primary_fails() {
		let (http, sender, _) = setup();
		http.fail_after(PRIMARY, Duration::from_millis(10), 500);
		http.reply_after(BACKUP, Duration::from_millis(80), envelope(json!("backup"), 2, 10, 1000));

		let reply = racing(true)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap();
		assert_eq!(reply.endpoint, BACKUP);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fallback_surfaces_backup_error() {
		let (http, sender, _) = setup();
		http.fail_after(PRIMARY, Duration::from_millis(10), 500);
		http.fail_after(BACKUP, Duration::from_millis(5), 504);

		let err = racing(true)
			.send(&sender, PRIMARY, &request(), false)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ClientError::Network { source: HttpError::Status { status: 504, .. }, .. }
		));
	}

	#[tokio::test]
	async fn test_backup_chosen_from_configured_set() {
		let (http, sender, _) = setup();
		let backups = ["http://b1", "http://b2", "http://b3"];
		let strategy = RacingWithBackups::new(
			backups.iter().map(|b| b.to_string()).collect(),
			true,
			Arc::new(Semaphore::new(2)),
		)
		.unwrap();

		for i in 0..10 {
			http.reply(PRIMARY, envelope(json!(i), 2, 10 + i, 1000 + i));
		}
		for _ in 0..10 {
			strategy
				.send(&sender, PRIMARY, &request(), false)
				.await
				.unwrap();
		}
		tokio::time::sleep(Duration::from_millis(10)).await;

		let calls = http.calls();
		assert_eq!(calls.len(), 20);
		for (url, _) in calls.iter().filter(|(url, _)| url != PRIMARY) {
			assert!(backups.contains(&url.as_str()));
		}
	}

	#[test]
	fn test_requires_backups() {
		assert!(matches!(
			RacingWithBackups::new(vec![], false, Arc::new(Semaphore::new(2))),
			Err(ClientError::Configuration(_))
		));
	}

	#[test]
	fn test_requires_pool_permits() {
		let result = RacingWithBackups::new(
			vec![BACKUP.to_string()],
			false,
			Arc::new(Semaphore::new(0)),
		);
		assert!(matches!(result, Err(ClientError::Configuration(ref msg)) if msg.contains("no permits")));
	}

	#[test]
	fn test_factory_reads_config() {
		let config: toml::Value = toml::from_str(
			r#"
backups = ["http://b1", "http://b2"]
fallback = true
max_concurrent_requests = 4
"#,
		)
		.unwrap();
		assert!(create_transport(&config).is_ok());

		let empty: toml::Value = toml::from_str("backups = []").unwrap();
		assert!(create_transport(&empty).is_err());

		let missing: toml::Value = toml::from_str("fallback = true").unwrap();
		assert!(create_transport(&missing).is_err());
	}
}
