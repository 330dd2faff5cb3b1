//! Wallet detection over a host environment.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use wallet_adapters::implementations::metamask::{METAMASK_DOWNLOAD_URL, METAMASK_ICON};
use wallet_adapters::implementations::tronlink::{TRONLINK_DOWNLOAD_URL, TRONLINK_ICON};
use wallet_adapters::HostEnvironment;
use wallet_types::{ChainFamily, WalletKind};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default ceiling for [`WalletDetector::wait_for_wallet`].
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Display metadata of a supported wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletMetadata {
	pub kind: WalletKind,
	pub name: &'static str,
	pub family: ChainFamily,
	pub icon: Option<&'static str>,
	pub download_url: Option<&'static str>,
	pub description: &'static str,
}

pub static SUPPORTED_WALLETS: [WalletMetadata; 6] = [
	WalletMetadata {
		kind: WalletKind::MetaMask,
		name: "MetaMask",
		family: ChainFamily::Evm,
		icon: Some(METAMASK_ICON),
		download_url: Some(METAMASK_DOWNLOAD_URL),
		description: "The most popular Ethereum wallet",
	},
	WalletMetadata {
		kind: WalletKind::WalletConnect,
		name: "WalletConnect",
		family: ChainFamily::Evm,
		icon: Some("https://avatars.githubusercontent.com/u/37784886"),
		download_url: Some("https://walletconnect.com/"),
		description: "Connect to 170+ wallets",
	},
	WalletMetadata {
		kind: WalletKind::CoinbaseWallet,
		name: "Coinbase Wallet",
		family: ChainFamily::Evm,
		icon: Some("https://www.coinbase.com/img/favicon/favicon-96x96.png"),
		download_url: Some("https://www.coinbase.com/wallet"),
		description: "Coinbase self-custody wallet",
	},
	WalletMetadata {
		kind: WalletKind::TronLink,
		name: "TronLink",
		family: ChainFamily::Tron,
		icon: Some(TRONLINK_ICON),
		download_url: Some(TRONLINK_DOWNLOAD_URL),
		description: "The official Tron wallet",
	},
	WalletMetadata {
		kind: WalletKind::WalletConnectTron,
		name: "WalletConnect (Tron)",
		family: ChainFamily::Tron,
		icon: None,
		download_url: Some("https://walletconnect.com/"),
		description: "WalletConnect for Tron",
	},
	WalletMetadata {
		kind: WalletKind::PrivateKey,
		name: "Private Key",
		family: ChainFamily::Evm,
		icon: None,
		download_url: None,
		description: "Import wallet using private key (for development)",
	},
];

pub fn wallet_metadata(kind: &WalletKind) -> Option<&'static WalletMetadata> {
	SUPPORTED_WALLETS.iter().find(|m| &m.kind == kind)
}

pub fn evm_wallets() -> Vec<&'static WalletMetadata> {
	SUPPORTED_WALLETS
		.iter()
		.filter(|m| m.family == ChainFamily::Evm)
		.collect()
}

pub fn tron_wallets() -> Vec<&'static WalletMetadata> {
	SUPPORTED_WALLETS
		.iter()
		.filter(|m| m.family == ChainFamily::Tron)
		.collect()
}

/// Result of probing one wallet kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAvailability {
	pub kind: WalletKind,
	pub family: ChainFamily,
	pub is_available: bool,
	pub download_url: Option<String>,
	pub detected: bool,
}

/// Probes a [`HostEnvironment`] for installed wallets.
pub struct WalletDetector {
	host: Arc<dyn HostEnvironment>,
}

impl WalletDetector {
	pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
		Self { host }
	}

	/// Every built-in kind except the private key signer.
	pub fn detect_all(&self) -> Vec<WalletAvailability> {
		WalletKind::BUILTIN
			.iter()
			.filter(|kind| **kind != WalletKind::PrivateKey)
			.map(|kind| self.detect(kind))
			.collect()
	}

	/// Kinds without metadata are reported as unavailable EVM wallets.
	pub fn detect(&self, kind: &WalletKind) -> WalletAvailability {
		let Some(metadata) = wallet_metadata(kind) else {
			return WalletAvailability {
				kind: kind.clone(),
				family: ChainFamily::Evm,
				is_available: false,
				download_url: None,
				detected: false,
			};
		};

		let is_available = self.is_available(kind);
		WalletAvailability {
			kind: kind.clone(),
			family: metadata.family,
			is_available,
			download_url: metadata.download_url.map(str::to_string),
			detected: is_available,
		}
	}

	pub fn is_available(&self, kind: &WalletKind) -> bool {
		if !self.host.has_dom() {
			return false;
		}

		match kind {
			// Any injected EIP-1193 provider is accepted.
			WalletKind::MetaMask => self.host.ethereum().is_some(),
			WalletKind::TronLink => {
				self.host.tron_web().is_some() || self.host.tron_link_events().is_some()
			}
			WalletKind::CoinbaseWallet => self
				.host
				.ethereum()
				.is_some_and(|provider| provider.is_coinbase_wallet()),
			WalletKind::WalletConnect | WalletKind::WalletConnectTron => true,
			WalletKind::PrivateKey => true,
			WalletKind::Custom(_) => false,
		}
	}

	/// Polls until `kind` becomes available or `timeout` elapses.
	pub async fn wait_for_wallet(&self, kind: &WalletKind, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		loop {
			if self.is_available(kind) {
				return true;
			}
			if Instant::now() >= deadline {
				return false;
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}
}
