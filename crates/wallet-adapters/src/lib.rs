//! Wallet adapters for the multi-chain wallet connector.
//!
//! Every wallet the manager can drive is exposed through the
//! [`WalletAdapter`] trait. The mandatory operations are connection
//! management and message signing; everything else is an optional
//! [`Capability`] whose default implementation fails with
//! `MethodNotSupported`.

use alloy::providers::DynProvider;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use wallet_types::{
	Account, AddChainParams, AdapterEvent, ChainFamily, ChainId, ContractReadParams,
	ContractWriteParams, EventEmitter, Transaction, TransactionReceipt, WalletError, WalletKind,
	WalletResult, WalletState,
};

pub mod abi;
pub mod base;
pub mod capabilities;
pub mod host;
pub mod injected;
pub mod receipt;

pub mod implementations {
	pub mod metamask;
	pub mod private_key;
	pub mod tronlink;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use base::AdapterCore;
pub use capabilities::{Capabilities, Capability};
pub use host::{
	DetachedHost, Eip1193Provider, HostEnvironment, HostEvent, HostEventSource, HostListener,
	HostSubscription, ProviderRpcError, TronWebProvider,
};
pub use implementations::metamask::MetaMaskAdapter;
pub use implementations::private_key::PrivateKeyAdapter;
pub use implementations::tronlink::TronLinkAdapter;

/// Opaque handle to the transport behind an adapter.
#[derive(Clone)]
pub enum ProviderHandle {
	Eip1193(Arc<dyn Eip1193Provider>),
	TronWeb(Arc<dyn TronWebProvider>),
	Rpc(DynProvider),
	LocalSigner(PrivateKeySigner),
	Unavailable,
}

impl ProviderHandle {
	pub fn is_available(&self) -> bool {
		!matches!(self, Self::Unavailable)
	}
}

impl std::fmt::Debug for ProviderHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Eip1193(_) => f.write_str("ProviderHandle::Eip1193"),
			Self::TronWeb(_) => f.write_str("ProviderHandle::TronWeb"),
			Self::Rpc(_) => f.write_str("ProviderHandle::Rpc"),
			Self::LocalSigner(signer) => f
				.debug_tuple("ProviderHandle::LocalSigner")
				.field(&signer.address())
				.finish(),
			Self::Unavailable => f.write_str("ProviderHandle::Unavailable"),
		}
	}
}

/// Builds the `MethodNotSupported` error for `capability` on `kind`.
pub fn unsupported(capability: Capability, kind: &WalletKind) -> WalletError {
	WalletError::method_not_supported(capability.method_name(), kind)
}

/// The capability surface of one wallet session.
///
/// Implementations are cheap to construct and hold no session until
/// [`WalletAdapter::connect`] succeeds. State changes and events go through
/// the adapter's [`AdapterCore`].
#[async_trait]
pub trait WalletAdapter: Send + Sync {
	fn core(&self) -> &AdapterCore;

	fn chain_family(&self) -> ChainFamily;

	fn name(&self) -> &str;

	fn icon(&self) -> Option<&str> {
		None
	}

	/// Optional operations this adapter implements.
	fn capabilities(&self) -> Capabilities;

	fn kind(&self) -> WalletKind {
		self.core().kind().clone()
	}

	fn state(&self) -> WalletState {
		self.core().state()
	}

	fn current_account(&self) -> Option<Account> {
		self.core().account()
	}

	fn events(&self) -> &EventEmitter<AdapterEvent> {
		self.core().events()
	}

	fn ensure_connected(&self) -> WalletResult<Account> {
		self.core().ensure_connected()
	}

	fn get_address(&self) -> WalletResult<String> {
		self.core().address()
	}

	async fn connect(&self, chain_id: Option<ChainId>) -> WalletResult<Account>;

	async fn disconnect(&self) -> WalletResult<()>;

	async fn is_available(&self) -> bool;

	async fn sign_message(&self, message: &str) -> WalletResult<String>;

	/// Accounts the host has already authorized, queried without prompting.
	///
	/// `None` means the adapter has no silent probe.
	async fn silent_accounts(&self) -> Option<Vec<String>> {
		None
	}

	fn provider(&self) -> ProviderHandle;

	async fn sign_transaction(&self, _transaction: &Transaction) -> WalletResult<String> {
		Err(unsupported(Capability::SignTransaction, self.core().kind()))
	}

	async fn sign_typed_data(&self, _typed_data: &Value) -> WalletResult<String> {
		Err(unsupported(Capability::SignTypedData, self.core().kind()))
	}

	async fn switch_chain(&self, _chain_id: ChainId) -> WalletResult<()> {
		Err(unsupported(Capability::SwitchChain, self.core().kind()))
	}

	async fn add_chain(&self, _params: &AddChainParams) -> WalletResult<()> {
		Err(unsupported(Capability::AddChain, self.core().kind()))
	}

	async fn read_contract(&self, _params: &ContractReadParams) -> WalletResult<Value> {
		Err(unsupported(Capability::ReadContract, self.core().kind()))
	}

	/// Sends a contract transaction and returns its hash.
	async fn write_contract(&self, _params: &ContractWriteParams) -> WalletResult<String> {
		Err(unsupported(Capability::WriteContract, self.core().kind()))
	}

	async fn estimate_gas(&self, _params: &ContractWriteParams) -> WalletResult<u64> {
		Err(unsupported(Capability::EstimateGas, self.core().kind()))
	}

	async fn wait_for_transaction(
		&self,
		_tx_hash: &str,
		_confirmations: u64,
	) -> WalletResult<TransactionReceipt> {
		Err(unsupported(Capability::WaitForTransaction, self.core().kind()))
	}

	fn signer(&self) -> WalletResult<ProviderHandle> {
		Err(unsupported(Capability::Signer, self.core().kind()))
	}
}
