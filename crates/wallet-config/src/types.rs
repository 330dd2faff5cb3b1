//! Configuration file schema.

use serde::{Deserialize, Serialize};
use wallet_core::WalletManagerConfig;
use wallet_storage::StorageConfig;
use wallet_types::{ChainId, ChainInfo, ChainRegistry};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
	#[serde(default)]
	pub manager: WalletManagerConfig,
	#[serde(default)]
	pub storage: StorageConfig,
	#[serde(default)]
	pub private_key: PrivateKeyConfig,
	/// Chains added to, or replacing entries of, the built-in table.
	#[serde(default)]
	pub chains: Vec<ChainInfo>,
}

impl WalletConfig {
	/// Built-in chain metadata with the configured chains layered on top.
	pub fn chain_registry(&self) -> ChainRegistry {
		ChainRegistry::new().with_chains(self.chains.iter().cloned())
	}
}

/// Development signer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	/// Chain to connect on; the manager's default chain when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<ChainId>,
}
