//! Account-related types for the wallet connector.
//!
//! This module defines chain families, wallet kinds, adapter connection states
//! and the immutable [`Account`] value that adapters publish when a session is
//! established or changes.

use crate::address::universal::create_universal_address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric chain identifier (EIP-155 id for EVM chains, 195 for Tron mainnet).
pub type ChainId = u64;

/// Chain-qualified address in the form `"<chainId>:<nativeAddress>"`.
pub type UniversalAddress = String;

/// Coarse grouping of networks that share an address and signing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ChainFamily {
	Evm,
	Tron,
}

impl ChainFamily {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Evm => "evm",
			Self::Tron => "tron",
		}
	}
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ChainFamily {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"evm" => Ok(Self::Evm),
			"tron" => Ok(Self::Tron),
			other => Err(format!("Unknown chain family: {}", other)),
		}
	}
}

/// Identifier of a wallet implementation.
///
/// The well-known kinds mirror the wallets shipped with the SDK; `Custom`
/// lets integrators register their own adapters under any other name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WalletKind {
	MetaMask,
	WalletConnect,
	CoinbaseWallet,
	TronLink,
	WalletConnectTron,
	PrivateKey,
	Custom(String),
}

impl WalletKind {
	/// Every built-in kind, in declaration order.
	pub const BUILTIN: [WalletKind; 6] = [
		WalletKind::MetaMask,
		WalletKind::WalletConnect,
		WalletKind::CoinbaseWallet,
		WalletKind::TronLink,
		WalletKind::WalletConnectTron,
		WalletKind::PrivateKey,
	];

	pub fn as_str(&self) -> &str {
		match self {
			Self::MetaMask => "metamask",
			Self::WalletConnect => "walletconnect",
			Self::CoinbaseWallet => "coinbase-wallet",
			Self::TronLink => "tronlink",
			Self::WalletConnectTron => "walletconnect-tron",
			Self::PrivateKey => "private-key",
			Self::Custom(name) => name,
		}
	}
}

impl fmt::Display for WalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<&str> for WalletKind {
	fn from(s: &str) -> Self {
		match s {
			"metamask" => Self::MetaMask,
			"walletconnect" => Self::WalletConnect,
			"coinbase-wallet" => Self::CoinbaseWallet,
			"tronlink" => Self::TronLink,
			"walletconnect-tron" => Self::WalletConnectTron,
			"private-key" => Self::PrivateKey,
			other => Self::Custom(other.to_string()),
		}
	}
}

impl From<String> for WalletKind {
	fn from(s: String) -> Self {
		Self::from(s.as_str())
	}
}

impl From<WalletKind> for String {
	fn from(kind: WalletKind) -> Self {
		kind.as_str().to_string()
	}
}

/// Connection state of a single adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletState {
	#[default]
	Disconnected,
	Connecting,
	Connected,
	Error,
}

impl fmt::Display for WalletState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Disconnected => write!(f, "disconnected"),
			Self::Connecting => write!(f, "connecting"),
			Self::Connected => write!(f, "connected"),
			Self::Error => write!(f, "error"),
		}
	}
}

/// One connected chain/address pair.
///
/// Accounts are never mutated after construction: a chain switch or an
/// account switch produces a new value through [`Account::with_chain`] or
/// [`Account::with_address`]. Compare accounts by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
	/// Universal address (`chainId:address`).
	pub universal_address: UniversalAddress,
	/// Native address (e.g. `0x…` or `T…`).
	pub native_address: String,
	pub chain_id: ChainId,
	pub chain_family: ChainFamily,
	pub is_active: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub balance: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl Account {
	/// Creates an active account, deriving the universal address.
	pub fn new(chain_id: ChainId, native_address: impl Into<String>, family: ChainFamily) -> Self {
		let native_address = native_address.into();
		Self {
			universal_address: create_universal_address(chain_id, &native_address),
			native_address,
			chain_id,
			chain_family: family,
			is_active: true,
			balance: None,
			name: None,
		}
	}

	/// Returns a copy of this account moved to another chain.
	pub fn with_chain(&self, chain_id: ChainId) -> Self {
		Self {
			universal_address: create_universal_address(chain_id, &self.native_address),
			chain_id,
			..self.clone()
		}
	}

	/// Returns a fresh account for a different address on the same chain.
	pub fn with_address(&self, native_address: impl Into<String>) -> Self {
		Self::new(self.chain_id, native_address, self.chain_family)
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wallet_kind_round_trips_through_strings() {
		for kind in WalletKind::BUILTIN {
			assert_eq!(WalletKind::from(kind.as_str()), kind);
		}
		assert_eq!(
			WalletKind::from("rabby"),
			WalletKind::Custom("rabby".to_string())
		);
	}

	#[test]
	fn test_wallet_kind_serializes_as_plain_string() {
		let json = serde_json::to_string(&WalletKind::TronLink).unwrap();
		assert_eq!(json, "\"tronlink\"");
		let kind: WalletKind = serde_json::from_str("\"private-key\"").unwrap();
		assert_eq!(kind, WalletKind::PrivateKey);
	}

	#[test]
	fn test_account_with_chain_rebuilds_universal_address() {
		let account = Account::new(1, "0xAbC", ChainFamily::Evm);
		let moved = account.with_chain(137);

		assert_eq!(account.universal_address, "1:0xAbC");
		assert_eq!(moved.universal_address, "137:0xAbC");
		assert_eq!(moved.native_address, "0xAbC");
		assert_ne!(account, moved);
	}

	#[test]
	fn test_account_with_address_keeps_chain() {
		let account = Account::new(195, "TOld", ChainFamily::Tron).with_name("main");
		let switched = account.with_address("TNew");

		assert_eq!(switched.chain_id, 195);
		assert_eq!(switched.universal_address, "195:TNew");
		assert!(switched.name.is_none());
	}

	#[test]
	fn test_chain_family_parsing() {
		assert_eq!("EVM".parse::<ChainFamily>().unwrap(), ChainFamily::Evm);
		assert_eq!("tron".parse::<ChainFamily>().unwrap(), ChainFamily::Tron);
		assert!("solana".parse::<ChainFamily>().is_err());
	}
}
