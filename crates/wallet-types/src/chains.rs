//! Static chain metadata and a registry that accepts configured overrides.

use crate::account::{ChainFamily, ChainId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// Metadata for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
	pub id: ChainId,
	pub name: String,
	pub chain_family: ChainFamily,
	/// SLIP-44 coin type, where one is assigned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub slip44: Option<u32>,
	pub native_currency: NativeCurrency,
	pub rpc_urls: Vec<String>,
	#[serde(default)]
	pub block_explorer_urls: Vec<String>,
}

impl ChainInfo {
	/// First RPC endpoint, if any.
	pub fn rpc_url(&self) -> Option<&str> {
		self.rpc_urls.first().map(String::as_str)
	}

	pub fn explorer_url(&self) -> Option<&str> {
		self.block_explorer_urls.first().map(String::as_str)
	}
}

fn chain(
	id: ChainId,
	name: &str,
	family: ChainFamily,
	slip44: Option<u32>,
	currency: (&str, &str, u8),
	rpc_urls: &[&str],
	explorers: &[&str],
) -> ChainInfo {
	ChainInfo {
		id,
		name: name.to_string(),
		chain_family: family,
		slip44,
		native_currency: NativeCurrency {
			name: currency.0.to_string(),
			symbol: currency.1.to_string(),
			decimals: currency.2,
		},
		rpc_urls: rpc_urls.iter().map(|s| s.to_string()).collect(),
		block_explorer_urls: explorers.iter().map(|s| s.to_string()).collect(),
	}
}

/// The built-in chain table.
pub fn all_chains() -> Vec<ChainInfo> {
	use ChainFamily::{Evm, Tron};

	vec![
		chain(
			1,
			"Ethereum Mainnet",
			Evm,
			Some(60),
			("Ether", "ETH", 18),
			&["https://eth.llamarpc.com"],
			&["https://etherscan.io"],
		),
		chain(
			11155111,
			"Sepolia Testnet",
			Evm,
			None,
			("Sepolia Ether", "ETH", 18),
			&["https://rpc.sepolia.org"],
			&["https://sepolia.etherscan.io"],
		),
		chain(
			56,
			"BNB Smart Chain",
			Evm,
			Some(714),
			("BNB", "BNB", 18),
			&["https://bsc-dataseed.binance.org"],
			&["https://bscscan.com"],
		),
		chain(
			97,
			"BNB Smart Chain Testnet",
			Evm,
			None,
			("BNB", "BNB", 18),
			&[
				"https://data-seed-prebsc-2-s1.binance.org:8545",
				"https://data-seed-prebsc-1-s2.binance.org:8545",
				"https://data-seed-prebsc-2-s2.binance.org:8545",
				"https://data-seed-prebsc-1-s3.binance.org:8545",
				"https://data-seed-prebsc-2-s3.binance.org:8545",
				"https://data-seed-prebsc-1-s1.binance.org:8545",
			],
			&["https://testnet.bscscan.com"],
		),
		chain(
			137,
			"Polygon Mainnet",
			Evm,
			Some(966),
			("MATIC", "MATIC", 18),
			&["https://polygon-rpc.com"],
			&["https://polygonscan.com"],
		),
		chain(
			80002,
			"Polygon Amoy Testnet",
			Evm,
			None,
			("MATIC", "MATIC", 18),
			&["https://rpc-amoy.polygon.technology"],
			&["https://www.oklink.com/amoy"],
		),
		chain(
			195,
			"Tron Mainnet",
			Tron,
			Some(195),
			("TRX", "TRX", 6),
			&["https://api.trongrid.io"],
			&["https://tronscan.org"],
		),
		chain(
			42161,
			"Arbitrum One",
			Evm,
			Some(1_042_161),
			("Ether", "ETH", 18),
			&["https://arb1.arbitrum.io/rpc"],
			&["https://arbiscan.io"],
		),
		chain(
			10,
			"Optimism",
			Evm,
			Some(1_000_010),
			("Ether", "ETH", 18),
			&["https://mainnet.optimism.io"],
			&["https://optimistic.etherscan.io"],
		),
		chain(
			43114,
			"Avalanche C-Chain",
			Evm,
			Some(9000),
			("AVAX", "AVAX", 18),
			&["https://api.avax.network/ext/bc/C/rpc"],
			&["https://snowtrace.io"],
		),
	]
}

/// Looks up a built-in chain.
pub fn chain_info(chain_id: ChainId) -> Option<ChainInfo> {
	all_chains().into_iter().find(|c| c.id == chain_id)
}

pub fn chain_family(chain_id: ChainId) -> Option<ChainFamily> {
	chain_info(chain_id).map(|c| c.chain_family)
}

pub fn is_evm_chain(chain_id: ChainId) -> bool {
	chain_family(chain_id) == Some(ChainFamily::Evm)
}

pub fn is_tron_chain(chain_id: ChainId) -> bool {
	chain_family(chain_id) == Some(ChainFamily::Tron)
}

/// Chain metadata lookup seeded with the built-in table.
///
/// Configured chains are layered on top: an entry with a known id replaces
/// the built-in one, a new id is added.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
	chains: BTreeMap<ChainId, ChainInfo>,
}

impl ChainRegistry {
	pub fn new() -> Self {
		Self {
			chains: all_chains().into_iter().map(|c| (c.id, c)).collect(),
		}
	}

	/// A registry without the built-in table.
	pub fn empty() -> Self {
		Self {
			chains: BTreeMap::new(),
		}
	}

	pub fn with_chains(mut self, chains: impl IntoIterator<Item = ChainInfo>) -> Self {
		for chain in chains {
			self.insert(chain);
		}
		self
	}

	/// Adds or replaces a chain, returning the entry it replaced.
	pub fn insert(&mut self, chain: ChainInfo) -> Option<ChainInfo> {
		self.chains.insert(chain.id, chain)
	}

	pub fn get(&self, chain_id: ChainId) -> Option<&ChainInfo> {
		self.chains.get(&chain_id)
	}

	pub fn family(&self, chain_id: ChainId) -> Option<ChainFamily> {
		self.get(chain_id).map(|c| c.chain_family)
	}

	pub fn chains(&self) -> impl Iterator<Item = &ChainInfo> {
		self.chains.values()
	}

	pub fn len(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}
}

impl Default for ChainRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builtin_lookup() {
		let eth = chain_info(1).unwrap();
		assert_eq!(eth.name, "Ethereum Mainnet");
		assert_eq!(eth.native_currency.decimals, 18);
		assert_eq!(eth.rpc_url(), Some("https://eth.llamarpc.com"));

		let tron = chain_info(195).unwrap();
		assert_eq!(tron.chain_family, ChainFamily::Tron);
		assert_eq!(tron.native_currency.decimals, 6);

		assert!(chain_info(999_999).is_none());
	}

	#[test]
	fn test_family_predicates() {
		assert!(is_evm_chain(42161));
		assert!(!is_evm_chain(195));
		assert!(is_tron_chain(195));
		assert!(!is_tron_chain(424242));
	}

	#[test]
	fn test_registry_overrides_and_extends() {
		let mut custom = chain_info(1).unwrap();
		custom.rpc_urls = vec!["http://localhost:8545".to_string()];
		let mut anvil = custom.clone();
		anvil.id = 31337;
		anvil.name = "Anvil".to_string();

		let registry = ChainRegistry::new().with_chains([custom, anvil]);

		assert_eq!(registry.len(), all_chains().len() + 1);
		assert_eq!(registry.get(1).unwrap().rpc_url(), Some("http://localhost:8545"));
		assert_eq!(registry.family(31337), Some(ChainFamily::Evm));
	}
}
