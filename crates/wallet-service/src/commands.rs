//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use wallet_adapters::DetachedHost;
use wallet_config::WalletConfig;
use wallet_core::{
	generate_nonce, AdapterRegistry, AuthMessageGenerator, SignatureVerifier, SnapshotStore,
	StorageData, WalletManager,
};
use wallet_storage::{create_storage, StorageService};
use wallet_types::{ChainFamily, ChainId, ChainInfo};

pub fn list_chains(config: &WalletConfig, family: Option<ChainFamily>) -> String {
	let registry = config.chain_registry();
	let chains: Vec<&ChainInfo> = registry
		.chains()
		.filter(|chain| family.map_or(true, |f| chain.chain_family == f))
		.collect();
	render_chains(&chains)
}

fn render_chains(chains: &[&ChainInfo]) -> String {
	let mut out = String::new();
	for chain in chains {
		out.push_str(&format!(
			"{:>10}  {:<5} {:<28} {:<5} {}\n",
			chain.id,
			chain.chain_family.as_str(),
			chain.name,
			chain.native_currency.symbol,
			chain.rpc_url().unwrap_or("-")
		));
	}
	out
}

pub fn describe_config(config: &WalletConfig) -> Vec<String> {
	let mut lines = vec![
		format!("Storage key: {}", config.manager.storage_key()),
		format!(
			"Persistence: {}",
			if config.manager.enable_storage {
				"enabled"
			} else {
				"disabled"
			}
		),
		format!("Storage backend: {:?} ({})", config.storage.backend, config.storage.path.display()),
		format!("Default EVM chain: {}", config.manager.default_chain_id),
		format!("Default Tron chain: {}", config.manager.default_tron_chain_id),
		format!(
			"Private key: {}",
			if config.private_key.key.is_some() {
				"configured"
			} else {
				"not configured"
			}
		),
	];
	for chain in &config.chains {
		lines.push(format!("Configured chain: {} ({})", chain.name, chain.id));
	}
	lines
}

/// Connects the private key through a manager and signs `message`.
///
/// Returns the universal address, the signature and whether it verified.
pub async fn sign(
	config: &WalletConfig,
	message: &str,
	key: Option<String>,
	chain_id: Option<ChainId>,
) -> Result<(String, String, bool)> {
	let Some(key) = key.or_else(|| config.private_key.key.clone()) else {
		bail!("No private key given; pass --key or set [private_key].key");
	};
	let chain_id = chain_id.or(config.private_key.chain_id);

	let chains = config.chain_registry();
	let manager = WalletManager::builder(config.manager.clone())
		.with_registry(AdapterRegistry::with_defaults(
			Arc::new(DetachedHost),
			chains.clone(),
		))
		.with_chains(chains)
		.build();

	let account = manager
		.connect_with_private_key(&key, chain_id)
		.await
		.context("Failed to connect private key wallet")?;
	info!(address = %account.universal_address, "Signing message");

	let signature = manager
		.sign_message(message)
		.await
		.context("Failed to sign message")?;
	let verified = SignatureVerifier::new().verify(
		message,
		&signature,
		&account.native_address,
		account.chain_family,
	);

	manager.disconnect_all().await;
	Ok((account.universal_address, signature, verified))
}

pub fn auth_message(
	config: &WalletConfig,
	domain: &str,
	family: ChainFamily,
	chain_id: Option<ChainId>,
	statement: Option<&str>,
) -> Result<String> {
	let chain_id = chain_id.unwrap_or(match family {
		ChainFamily::Tron => config.manager.default_tron_chain_id,
		_ => config.manager.default_chain_id,
	});
	let nonce = generate_nonce();
	debug!(%nonce, chain_id, "Generating sign-in message");

	AuthMessageGenerator::new(domain)
		.generate_now(family, &nonce, chain_id, statement)
		.context("Failed to generate sign-in message")
}

pub async fn load_snapshot(config: &WalletConfig) -> Option<StorageData> {
	let storage = Arc::new(StorageService::new(create_storage(&config.storage)));
	SnapshotStore::new(storage, config.manager.storage_key())
		.load()
		.await
}

pub fn render_status(snapshot: Option<&StorageData>) -> String {
	let Some(snapshot) = snapshot else {
		return "No stored connection\n".to_string();
	};

	let mut out = format!(
		"Current: {}\n",
		snapshot.current.as_deref().unwrap_or("none")
	);
	if let Some(kind) = &snapshot.primary_wallet_kind {
		out.push_str(&format!("Primary wallet: {}\n", kind));
	}
	if let Some(chain_id) = snapshot.primary_chain_id {
		out.push_str(&format!("Primary chain: {}\n", chain_id));
	}
	for record in &snapshot.history {
		out.push_str(&format!(
			"  {} {} {}\n",
			record.wallet_kind, record.chain_family, record.universal_address
		));
	}
	out
}
