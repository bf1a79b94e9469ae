//! Command-line client for a ledger JSON-RPC server.
//!
//! Loads a configuration file, builds a `LedgerClient` and runs a single
//! command. Results are printed to stdout as JSON.

use clap::{Parser, Subcommand};
use ledger_client::{ClientError, LedgerClient};
use ledger_config::Config;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the ledger client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "LEDGER_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Print ledger metadata
	Metadata {
		/// Ledger version to read at; latest if omitted
		#[arg(long)]
		version: Option<u64>,
	},
	/// Print an account
	Account { address: String },
	/// Print an account's sequence number
	Sequence { address: String },
	/// Print the transaction an account sent with a sequence number
	Transaction {
		address: String,
		sequence_number: u64,
		/// Include emitted events
		#[arg(long)]
		events: bool,
	},
	/// Submit a hex-encoded signed transaction
	Submit { signed_transaction: String },
	/// Wait for a submitted transaction to execute
	Wait {
		sender: String,
		sequence_number: u64,
		expiration_time_secs: u64,
		hash: String,
		/// Give up after this many seconds; configured default if omitted
		#[arg(long)]
		timeout_secs: Option<u64>,
	},
	/// Print the last ledger state seen by the client
	State,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr so stdout stays machine readable.
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = load_config(&args.config).await?;
	let client = LedgerClient::from_config(&config)?;

	let output = run(&client, args.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

async fn load_config(path: &std::path::Path) -> Result<Config, Box<dyn std::error::Error>> {
	let path = path
		.to_str()
		.ok_or_else(|| format!("config path is not valid UTF-8: {}", path.display()))?;
	let config = Config::from_file(path).await?;
	tracing::info!(path, server_url = %config.client.server_url, "Loaded configuration");
	Ok(config)
}

/// Runs one command and returns its JSON output.
async fn run(client: &LedgerClient, command: Command) -> Result<Value, Box<dyn std::error::Error>> {
	let output = match command {
		Command::Metadata { version } => to_json(client.get_metadata(version).await)?,
		Command::Account { address } => to_json(client.get_account(&address).await)?,
		Command::Sequence { address } => to_json(client.get_account_sequence(&address).await)?,
		Command::Transaction {
			address,
			sequence_number,
			events,
		} => to_json(
			client
				.get_account_transaction(&address, sequence_number, events)
				.await,
		)?,
		Command::Submit { signed_transaction } => {
			client.submit(&signed_transaction).await?;
			json!({"submitted": true})
		},
		Command::Wait {
			sender,
			sequence_number,
			expiration_time_secs,
			hash,
			timeout_secs,
		} => to_json(
			client
				.wait_for_transaction(
					&sender,
					sequence_number,
					expiration_time_secs,
					&hash,
					timeout_secs.map(Duration::from_secs),
					None,
				)
				.await,
		)?,
		Command::State => serde_json::to_value(client.get_last_known_state())?,
	};
	Ok(output)
}

fn to_json<T: serde::Serialize>(
	result: Result<T, ClientError>,
) -> Result<Value, Box<dyn std::error::Error>> {
	Ok(serde_json::to_value(result?)?)
}
