use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wallet_config::{ConfigLoader, WalletConfig};

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	setup_tracing(&args.log_level);

	let config = load_config(&args).await?;

	match args.command {
		Command::Chains { family } => {
			print!("{}", commands::list_chains(&config, family));
		}
		Command::Validate => {
			info!("Configuration is valid");
			for line in commands::describe_config(&config) {
				info!("  {}", line);
			}
		}
		Command::Sign {
			message,
			key,
			chain_id,
		} => {
			let (address, signature, verified) =
				commands::sign(&config, &message, key, chain_id).await?;
			println!("address:   {}", address);
			println!("signature: {}", signature);
			println!("verified:  {}", verified);
		}
		Command::AuthMessage {
			domain,
			family,
			chain_id,
			statement,
		} => {
			let message =
				commands::auth_message(&config, &domain, family, chain_id, statement.as_deref())?;
			println!("{}", message);
		}
		Command::Status => {
			let snapshot = commands::load_snapshot(&config).await;
			print!("{}", commands::render_status(snapshot.as_ref()));
		}
	}

	Ok(())
}

async fn load_config(args: &Args) -> Result<WalletConfig> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &args.config {
		info!("Loading configuration from: {:?}", path);
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}
