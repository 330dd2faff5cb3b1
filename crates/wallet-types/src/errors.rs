//! Error types for the wallet connector.

use crate::account::{ChainFamily, ChainId, WalletKind};
use thiserror::Error;

pub type WalletResult<T> = std::result::Result<T, WalletError>;

/// What a rejected signature prompt was asking the user to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureTarget {
	Message,
	Transaction,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
	#[error("{}", not_connected_message(.target))]
	NotConnected { target: Option<String> },

	#[error("Wallet {wallet} is not available. Please install it first.")]
	NotAvailable {
		wallet: String,
		download_url: Option<String>,
	},

	#[error("Connection to {wallet} was rejected by user")]
	ConnectionRejected { wallet: String },

	#[error("{message}")]
	SignatureRejected {
		target: SignatureTarget,
		message: String,
	},

	#[error("Chain {chain_id} is not supported by {wallet}")]
	ChainNotSupported { chain_id: ChainId, wallet: String },

	#[error("Method {method} is not supported by {wallet}")]
	MethodNotSupported { method: String, wallet: String },

	#[error("Transaction {tx_hash} failed{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
	TransactionFailed {
		tx_hash: String,
		reason: Option<String>,
	},

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Network error: {0}")]
	Network(String),

	/// Host provider error that does not map onto a known category.
	#[error("Provider error{}: {message}", .code.map(|c| format!(" ({})", c)).unwrap_or_default())]
	Provider { code: Option<i64>, message: String },

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

fn not_connected_message(target: &Option<String>) -> String {
	match target {
		Some(target) => format!("Wallet {} is not connected", target),
		None => "No wallet is connected".to_string(),
	}
}

impl WalletError {
	pub fn not_connected(wallet: &WalletKind) -> Self {
		Self::NotConnected {
			target: Some(wallet.to_string()),
		}
	}

	/// No wallet of `family` is connected.
	pub fn family_not_connected(family: ChainFamily) -> Self {
		Self::NotConnected {
			target: Some(format!("for chain family {}", family)),
		}
	}

	pub fn no_wallet() -> Self {
		Self::NotConnected { target: None }
	}

	pub fn not_available(wallet: &WalletKind, download_url: Option<&str>) -> Self {
		Self::NotAvailable {
			wallet: wallet.to_string(),
			download_url: download_url.map(str::to_string),
		}
	}

	pub fn connection_rejected(wallet: &WalletKind) -> Self {
		Self::ConnectionRejected {
			wallet: wallet.to_string(),
		}
	}

	pub fn signature_rejected(target: SignatureTarget) -> Self {
		let message = match target {
			SignatureTarget::Message => "Signature was rejected by user",
			SignatureTarget::Transaction => "Transaction signature was rejected by user",
		};
		Self::SignatureRejected {
			target,
			message: message.to_string(),
		}
	}

	pub fn signature_rejected_with(target: SignatureTarget, message: impl Into<String>) -> Self {
		Self::SignatureRejected {
			target,
			message: message.into(),
		}
	}

	pub fn chain_not_supported(chain_id: ChainId, wallet: &WalletKind) -> Self {
		Self::ChainNotSupported {
			chain_id,
			wallet: wallet.to_string(),
		}
	}

	pub fn method_not_supported(method: &str, wallet: &WalletKind) -> Self {
		Self::MethodNotSupported {
			method: method.to_string(),
			wallet: wallet.to_string(),
		}
	}

	pub fn transaction_failed(tx_hash: impl Into<String>, reason: Option<&str>) -> Self {
		Self::TransactionFailed {
			tx_hash: tx_hash.into(),
			reason: reason.map(str::to_string),
		}
	}

	/// Stable machine-readable code for this error.
	pub fn code(&self) -> &'static str {
		match self {
			Self::NotConnected { .. } => "WALLET_NOT_CONNECTED",
			Self::NotAvailable { .. } => "WALLET_NOT_AVAILABLE",
			Self::ConnectionRejected { .. } => "CONNECTION_REJECTED",
			Self::SignatureRejected { .. } => "SIGNATURE_REJECTED",
			Self::ChainNotSupported { .. } => "CHAIN_NOT_SUPPORTED",
			Self::MethodNotSupported { .. } => "METHOD_NOT_SUPPORTED",
			Self::TransactionFailed { .. } => "TRANSACTION_FAILED",
			Self::Configuration(_) => "CONFIGURATION_ERROR",
			Self::Network(_) => "NETWORK_ERROR",
			Self::Provider { .. } => "PROVIDER_ERROR",
			Self::InvalidAddress(_) => "INVALID_ADDRESS",
			Self::Serialization(_) => "SERIALIZATION_ERROR",
		}
	}
}

impl From<serde_json::Error> for WalletError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_not_connected_messages() {
		assert_eq!(
			WalletError::no_wallet().to_string(),
			"No wallet is connected"
		);
		assert_eq!(
			WalletError::not_connected(&WalletKind::MetaMask).to_string(),
			"Wallet metamask is not connected"
		);
	}

	#[test]
	fn test_method_not_supported_names_method_and_wallet() {
		let err = WalletError::method_not_supported("switchChain", &WalletKind::TronLink);
		assert_eq!(err.code(), "METHOD_NOT_SUPPORTED");
		assert_eq!(
			err.to_string(),
			"Method switchChain is not supported by tronlink"
		);
	}

	#[test]
	fn test_transaction_failed_reason_is_optional() {
		let bare = WalletError::transaction_failed("0xabc", None);
		let with_reason = WalletError::transaction_failed("0xabc", Some("Transaction reverted"));

		assert_eq!(bare.to_string(), "Transaction 0xabc failed");
		assert_eq!(
			with_reason.to_string(),
			"Transaction 0xabc failed: Transaction reverted"
		);
	}

	#[test]
	fn test_not_available_carries_download_url() {
		let err = WalletError::not_available(&WalletKind::TronLink, Some("https://www.tronlink.org/"));
		match err {
			WalletError::NotAvailable { download_url, .. } => {
				assert_eq!(download_url.as_deref(), Some("https://www.tronlink.org/"))
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn test_provider_error_display() {
		let err = WalletError::Provider {
			code: Some(-32603),
			message: "Internal error".to_string(),
		};
		assert_eq!(err.to_string(), "Provider error (-32603): Internal error");
	}
}
