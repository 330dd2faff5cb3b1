//! Host environment probe.
//!
//! Browser wallets inject their providers into the page's global scope. The
//! adapters never reach for such globals directly; they receive a
//! [`HostEnvironment`] at construction and ask it for the provider objects,
//! which lets tests and non-browser embeddings substitute their own hosts.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use wallet_types::WalletError;

/// An error returned by a host provider's `request` call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (code {code})")]
pub struct ProviderRpcError {
	pub code: i64,
	pub message: String,
	pub data: Option<Value>,
}

impl ProviderRpcError {
	/// The user declined the prompt.
	pub const USER_REJECTED: i64 = 4001;
	/// The requested chain has not been added to the wallet.
	pub const UNRECOGNIZED_CHAIN: i64 = 4902;
	pub const INTERNAL: i64 = -32603;

	pub fn new(code: i64, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			data: None,
		}
	}

	pub fn user_rejected() -> Self {
		Self::new(Self::USER_REJECTED, "User rejected the request.")
	}

	pub fn is_user_rejection(&self) -> bool {
		self.code == Self::USER_REJECTED
	}
}

impl From<ProviderRpcError> for WalletError {
	fn from(e: ProviderRpcError) -> Self {
		WalletError::Provider {
			code: Some(e.code),
			message: e.message,
		}
	}
}

/// Provider-level notifications forwarded to adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
	/// The set of accounts authorized for this origin changed.
	AccountsChanged(Vec<String>),
	/// The active chain changed; carries the `0x`-prefixed hex chain id.
	ChainChanged(String),
	/// The provider dropped its connection.
	Disconnect,
}

pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Handle for a registered [`HostListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostSubscription(pub u64);

/// Something that pushes [`HostEvent`]s to subscribers.
pub trait HostEventSource: Send + Sync {
	fn subscribe(&self, listener: HostListener) -> HostSubscription;

	fn unsubscribe(&self, subscription: HostSubscription);
}

/// An EIP-1193 provider such as the one MetaMask injects as `window.ethereum`.
#[async_trait]
pub trait Eip1193Provider: HostEventSource {
	/// Whether the provider identifies itself as MetaMask.
	fn is_metamask(&self) -> bool;

	fn is_coinbase_wallet(&self) -> bool {
		false
	}

	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;
}

/// The TronWeb object TronLink injects as `window.tronWeb`.
#[async_trait]
pub trait TronWebProvider: Send + Sync {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

	/// Base58 form of the currently selected account, once the user has
	/// authorized the page.
	fn default_address(&self) -> Option<String>;

	fn supports_sign_message_v2(&self) -> bool;

	async fn sign_message_v2(&self, message: &str) -> Result<String, ProviderRpcError>;

	/// Legacy signing entry point, used for both transactions and messages.
	async fn sign(&self, payload: Value) -> Result<Value, ProviderRpcError>;
}

/// Access to the host's injected wallet objects.
pub trait HostEnvironment: Send + Sync {
	/// Whether a browser-like global scope exists at all.
	fn has_dom(&self) -> bool;

	fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>>;

	fn tron_web(&self) -> Option<Arc<dyn TronWebProvider>>;

	/// TronLink's own event channel, when the extension exposes one.
	fn tron_link_events(&self) -> Option<Arc<dyn HostEventSource>>;
}

/// A host without a DOM, as seen by a server process or CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedHost;

impl HostEnvironment for DetachedHost {
	fn has_dom(&self) -> bool {
		false
	}

	fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
		None
	}

	fn tron_web(&self) -> Option<Arc<dyn TronWebProvider>> {
		None
	}

	fn tron_link_events(&self) -> Option<Arc<dyn HostEventSource>> {
		None
	}
}
