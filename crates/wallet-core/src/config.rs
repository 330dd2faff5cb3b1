//! Wallet manager settings.

use serde::{Deserialize, Serialize};
use wallet_types::ChainId;

/// Behaviour switches of the [`crate::WalletManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletManagerConfig {
	/// Persist the connection snapshot after every change.
	pub enable_storage: bool,
	/// Prefix of the storage key; the snapshot lives under `<prefix>data`.
	pub storage_prefix: String,
	/// Chain used by `connect_with_private_key` when none is given.
	pub default_chain_id: ChainId,
	pub default_tron_chain_id: ChainId,
	pub wallet_connect_project_id: String,
}

impl Default for WalletManagerConfig {
	fn default() -> Self {
		Self {
			enable_storage: true,
			storage_prefix: "enclave_wallet_".to_string(),
			default_chain_id: 1,
			default_tron_chain_id: 195,
			wallet_connect_project_id: String::new(),
		}
	}
}

impl WalletManagerConfig {
	pub fn storage_key(&self) -> String {
		format!("{}data", self.storage_prefix)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_config_keeps_defaults() {
		let config: WalletManagerConfig =
			serde_json::from_str(r#"{ "storage_prefix": "app_" }"#).unwrap();

		assert!(config.enable_storage);
		assert_eq!(config.default_tron_chain_id, 195);
		assert_eq!(config.storage_key(), "app_data");
	}
}
