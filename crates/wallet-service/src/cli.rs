//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallet_types::{ChainFamily, ChainId};

#[derive(Parser, Debug)]
#[command(name = "walletctl")]
#[command(about = "Multi-chain wallet connector toolkit", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "WALLET_CONFIG_FILE")]
	pub config: Option<PathBuf>,

	/// Log level, used when RUST_LOG is unset
	#[arg(short, long, env = "WALLET_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// List known chain metadata
	Chains {
		/// Only list chains of this family (evm, tron)
		#[arg(long, value_parser = parse_family)]
		family: Option<ChainFamily>,
	},

	/// Load and validate the configuration
	Validate,

	/// Sign a message with the configured private key
	Sign {
		/// Message to sign
		message: String,

		/// Private key, overriding the configured one
		#[arg(long, env = "WALLET_SIGN_KEY", hide_env_values = true)]
		key: Option<String>,

		/// Chain to connect on
		#[arg(long)]
		chain_id: Option<ChainId>,
	},

	/// Print a sign-in message with a fresh nonce
	AuthMessage {
		/// Domain requesting the sign-in
		#[arg(long, default_value = "localhost")]
		domain: String,

		#[arg(long, value_parser = parse_family, default_value = "evm")]
		family: ChainFamily,

		/// Chain id; the configured default for the family when unset
		#[arg(long)]
		chain_id: Option<ChainId>,

		#[arg(long)]
		statement: Option<String>,
	},

	/// Show the persisted connection snapshot
	Status,
}

fn parse_family(value: &str) -> Result<ChainFamily, String> {
	value.parse()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_sign_command() {
		let args =
			Args::try_parse_from(["walletctl", "sign", "hello", "--chain-id", "31337"]).unwrap();
		match args.command {
			Command::Sign {
				message, chain_id, ..
			} => {
				assert_eq!(message, "hello");
				assert_eq!(chain_id, Some(31337));
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn test_auth_message_defaults() {
		let args = Args::try_parse_from(["walletctl", "auth-message", "--family", "TRON"]).unwrap();
		match args.command {
			Command::AuthMessage {
				domain,
				family,
				chain_id,
				statement,
			} => {
				assert_eq!(domain, "localhost");
				assert_eq!(family, ChainFamily::Tron);
				assert_eq!(chain_id, None);
				assert_eq!(statement, None);
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn test_unknown_family_rejected() {
		let result = Args::try_parse_from(["walletctl", "chains", "--family", "solana"]);
		assert!(result.is_err());
	}
}
