//! MetaMask adapter over the injected EIP-1193 provider.

use crate::abi::{decode_output, encode_call, resolve_function};
use crate::base::AdapterCore;
use crate::capabilities::{Capabilities, Capability};
use crate::host::{Eip1193Provider, HostEnvironment, HostEvent, HostSubscription, ProviderRpcError};
use crate::injected::{apply_accounts_changed, apply_chain_changed, InjectedWallet};
use crate::receipt::{confirmations, parse_rpc_receipt};
use crate::{ProviderHandle, WalletAdapter};
use alloy::hex;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use wallet_types::address::evm::{format_evm_address, number_to_hex, parse_quantity};
use wallet_types::{
	Account, AddChainParams, ChainFamily, ChainId, ChainRegistry, ContractReadParams,
	ContractWriteParams, SignatureTarget, Transaction, TransactionReceipt, WalletError,
	WalletKind, WalletResult, WalletState,
};

pub const METAMASK_DOWNLOAD_URL: &str = "https://metamask.io/download/";
pub const METAMASK_ICON: &str =
	"https://upload.wikimedia.org/wikipedia/commons/3/36/MetaMask_Fox.svg";

const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

type Attached = (Arc<dyn Eip1193Provider>, HostSubscription);

fn release(slot: &Mutex<Option<Attached>>) {
	let attached = slot.lock().take();
	if let Some((provider, subscription)) = attached {
		provider.unsubscribe(subscription);
	}
}

/// Adapter for the MetaMask browser extension.
pub struct MetaMaskAdapter {
	core: AdapterCore,
	host: Arc<dyn HostEnvironment>,
	chains: ChainRegistry,
	attached: Arc<Mutex<Option<Attached>>>,
	receipt_poll_interval: Duration,
}

impl MetaMaskAdapter {
	pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
		Self {
			core: AdapterCore::new(WalletKind::MetaMask),
			host,
			chains: ChainRegistry::new(),
			attached: Arc::new(Mutex::new(None)),
			receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
		}
	}

	/// Chain metadata used when the wallet asks for an unknown chain to be added.
	pub fn with_chains(mut self, chains: ChainRegistry) -> Self {
		self.chains = chains;
		self
	}

	pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
		self.receipt_poll_interval = interval;
		self
	}

	fn ethereum(&self) -> WalletResult<Arc<dyn Eip1193Provider>> {
		self.host
			.ethereum()
			.filter(|p| p.is_metamask())
			.ok_or_else(|| WalletError::not_available(self.core.kind(), Some(METAMASK_DOWNLOAD_URL)))
	}

	async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
		let provider = self.ethereum()?;
		provider.request(method, params).await.map_err(Into::into)
	}

	async fn open_session(&self, chain_id: Option<ChainId>) -> WalletResult<Account> {
		let provider = self.ethereum()?;
		let rejected = |e: ProviderRpcError| {
			if e.is_user_rejection() {
				WalletError::connection_rejected(self.core.kind())
			} else {
				e.into()
			}
		};

		let accounts = provider
			.request("eth_requestAccounts", json!([]))
			.await
			.map_err(&rejected)?;
		let first = accounts
			.as_array()
			.and_then(|list| list.first())
			.and_then(Value::as_str)
			.ok_or_else(|| WalletError::connection_rejected(self.core.kind()))?;
		let address = format_evm_address(first)?;

		let current = provider
			.request("eth_chainId", json!([]))
			.await
			.map_err(&rejected)?;
		let current = parse_chain_id(&current)?;

		let resolved = match chain_id {
			Some(requested) if requested != current => {
				self.switch_provider_chain(&provider, requested).await?;
				requested
			}
			_ => current,
		};

		Ok(Account::new(resolved, address, ChainFamily::Evm))
	}

	/// Issues `wallet_switchEthereumChain`. A chain the wallet does not know
	/// yet is added from chain metadata and the switch is retried once.
	async fn switch_provider_chain(
		&self,
		provider: &Arc<dyn Eip1193Provider>,
		chain_id: ChainId,
	) -> WalletResult<()> {
		let params = json!([{ "chainId": number_to_hex(chain_id.into()) }]);

		match provider.request("wallet_switchEthereumChain", params.clone()).await {
			Ok(_) => Ok(()),
			Err(e) if e.code == ProviderRpcError::UNRECOGNIZED_CHAIN => {
				let info = self
					.chains
					.get(chain_id)
					.ok_or_else(|| WalletError::chain_not_supported(chain_id, self.core.kind()))?;
				debug!(chain_id, "Adding chain before switching");
				self.add_chain(&AddChainParams::from(info)).await?;
				provider
					.request("wallet_switchEthereumChain", params)
					.await
					.map(|_| ())
					.map_err(Into::into)
			}
			Err(e) => Err(e.into()),
		}
	}

	fn sign_error(e: ProviderRpcError, target: SignatureTarget) -> WalletError {
		if e.is_user_rejection() {
			match target {
				SignatureTarget::Message => WalletError::signature_rejected(target),
				SignatureTarget::Transaction => WalletError::signature_rejected_with(
					target,
					"Transaction was rejected by user",
				),
			}
		} else {
			e.into()
		}
	}

	fn call_object(from: Option<&str>, params: &ContractWriteParams) -> WalletResult<Value> {
		let call = &params.call;
		let function = resolve_function(&call.abi, &call.function_name, call.args.len())?;
		let data = encode_call(&function, &call.args)?;

		let mut tx = json!({
			"to": call.address,
			"data": hex::encode_prefixed(data),
		});
		if let Some(from) = from {
			tx["from"] = json!(from);
		}
		if let Some(value) = &params.value {
			tx["value"] = json!(quantity_hex(value)?);
		}
		if let Some(gas) = params.gas {
			tx["gas"] = json!(number_to_hex(gas.into()));
		}
		if let Some(gas_price) = &params.gas_price {
			tx["gasPrice"] = json!(quantity_hex(gas_price)?);
		}
		Ok(tx)
	}
}

fn parse_chain_id(value: &Value) -> WalletResult<ChainId> {
	value
		.as_str()
		.and_then(parse_quantity)
		.and_then(|id| ChainId::try_from(id).ok())
		.ok_or_else(|| WalletError::Provider {
			code: None,
			message: format!("Invalid chain id from provider: {}", value),
		})
}

fn quantity_hex(value: &str) -> WalletResult<String> {
	parse_quantity(value)
		.map(number_to_hex)
		.ok_or_else(|| WalletError::Serialization(format!("Invalid numeric value: {}", value)))
}

#[async_trait]
impl WalletAdapter for MetaMaskAdapter {
	fn core(&self) -> &AdapterCore {
		&self.core
	}

	fn chain_family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn name(&self) -> &str {
		"MetaMask"
	}

	fn icon(&self) -> Option<&str> {
		Some(METAMASK_ICON)
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities::all()
	}

	async fn connect(&self, chain_id: Option<ChainId>) -> WalletResult<Account> {
		self.ensure_available()?;
		self.core.set_state(WalletState::Connecting);

		match self.open_session(chain_id).await {
			Ok(account) => {
				self.core.set_connected(account.clone());
				self.attach_listeners();
				Ok(account)
			}
			Err(e) => {
				self.core.reset(WalletState::Error);
				Err(e)
			}
		}
	}

	async fn disconnect(&self) -> WalletResult<()> {
		self.disconnect_injected();
		Ok(())
	}

	async fn is_available(&self) -> bool {
		self.injected_available()
	}

	async fn silent_accounts(&self) -> Option<Vec<String>> {
		let provider = self.ethereum().ok()?;
		match provider.request("eth_accounts", json!([])).await {
			Ok(accounts) => serde_json::from_value(accounts).ok(),
			Err(e) => {
				debug!(error = %e, "eth_accounts failed");
				None
			}
		}
	}

	fn provider(&self) -> ProviderHandle {
		match self.ethereum() {
			Ok(provider) => ProviderHandle::Eip1193(provider),
			Err(_) => ProviderHandle::Unavailable,
		}
	}

	fn signer(&self) -> WalletResult<ProviderHandle> {
		self.core.ensure_connected()?;
		self.ethereum().map(ProviderHandle::Eip1193)
	}

	async fn sign_message(&self, message: &str) -> WalletResult<String> {
		let account = self.core.ensure_connected()?;
		let provider = self.ethereum()?;
		let signature = provider
			.request("personal_sign", json!([message, account.native_address]))
			.await
			.map_err(|e| Self::sign_error(e, SignatureTarget::Message))?;
		string_result(signature)
	}

	async fn sign_typed_data(&self, typed_data: &Value) -> WalletResult<String> {
		let account = self.core.ensure_connected()?;
		let provider = self.ethereum()?;
		let payload = serde_json::to_string(typed_data)?;
		let signature = provider
			.request(
				"eth_signTypedData_v4",
				json!([account.native_address, payload]),
			)
			.await
			.map_err(|e| Self::sign_error(e, SignatureTarget::Message))?;
		string_result(signature)
	}

	async fn sign_transaction(&self, transaction: &Transaction) -> WalletResult<String> {
		let account = self.core.ensure_connected()?;
		let Transaction::Evm(tx) = transaction else {
			return Err(WalletError::Configuration(
				"MetaMask can only sign EVM transactions".to_string(),
			));
		};
		let mut payload = serde_json::to_value(tx)?;
		payload["from"] = json!(account.native_address);

		let provider = self.ethereum()?;
		let signed = provider
			.request("eth_signTransaction", json!([payload]))
			.await
			.map_err(|e| Self::sign_error(e, SignatureTarget::Transaction))?;
		string_result(signed)
	}

	async fn switch_chain(&self, chain_id: ChainId) -> WalletResult<()> {
		self.core.ensure_connected()?;
		let provider = self.ethereum()?;
		self.switch_provider_chain(&provider, chain_id).await?;
		self.core.change_chain(chain_id);
		Ok(())
	}

	async fn add_chain(&self, params: &AddChainParams) -> WalletResult<()> {
		let mut chain = serde_json::to_value(params)?;
		chain["chainId"] = json!(number_to_hex(params.chain_id.into()));
		self.request("wallet_addEthereumChain", json!([chain]))
			.await
			.map(|_| ())
	}

	async fn read_contract(&self, params: &ContractReadParams) -> WalletResult<Value> {
		let function = resolve_function(&params.abi, &params.function_name, params.args.len())?;
		let data = encode_call(&function, &params.args)?;
		let call = json!({
			"to": params.address,
			"data": hex::encode_prefixed(data),
		});

		let result = self.request("eth_call", json!([call, "latest"])).await?;
		let bytes = result
			.as_str()
			.map(hex::decode)
			.transpose()
			.map_err(|e| WalletError::Serialization(e.to_string()))?
			.unwrap_or_default();
		decode_output(&function, &bytes)
	}

	async fn write_contract(&self, params: &ContractWriteParams) -> WalletResult<String> {
		let account = self.core.ensure_connected()?;
		let tx = Self::call_object(Some(&account.native_address), params)?;

		let provider = self.ethereum()?;
		let hash = provider
			.request("eth_sendTransaction", json!([tx]))
			.await
			.map_err(|e| Self::sign_error(e, SignatureTarget::Transaction))?;
		string_result(hash)
	}

	async fn estimate_gas(&self, params: &ContractWriteParams) -> WalletResult<u64> {
		let from = self.core.account().map(|a| a.native_address);
		let mut tx = Self::call_object(from.as_deref(), params)?;
		if let Some(object) = tx.as_object_mut() {
			object.remove("gas");
			object.remove("gasPrice");
		}

		let gas = self.request("eth_estimateGas", json!([tx])).await?;
		gas.as_str()
			.and_then(parse_quantity)
			.and_then(|g| u64::try_from(g).ok())
			.ok_or_else(|| WalletError::Serialization(format!("Invalid gas estimate: {}", gas)))
	}

	async fn wait_for_transaction(
		&self,
		tx_hash: &str,
		required: u64,
	) -> WalletResult<TransactionReceipt> {
		loop {
			let raw = self
				.request("eth_getTransactionReceipt", json!([tx_hash]))
				.await?;

			if !raw.is_null() {
				let receipt = parse_rpc_receipt(&raw)?;
				if !receipt.is_success() {
					return Err(WalletError::transaction_failed(
						tx_hash,
						Some("Transaction reverted"),
					));
				}
				if required <= 1 {
					return Ok(receipt);
				}

				let head = self.request("eth_blockNumber", json!([])).await?;
				let head = head
					.as_str()
					.and_then(parse_quantity)
					.and_then(|h| u64::try_from(h).ok())
					.unwrap_or(receipt.block_number);
				if confirmations(receipt.block_number, head) >= required {
					return Ok(receipt);
				}
			}

			tokio::time::sleep(self.receipt_poll_interval).await;
		}
	}
}

fn string_result(value: Value) -> WalletResult<String> {
	match value {
		Value::String(s) => Ok(s),
		other => Err(WalletError::Serialization(format!(
			"Expected a string result, got {}",
			other
		))),
	}
}

impl InjectedWallet for MetaMaskAdapter {
	fn host(&self) -> &dyn HostEnvironment {
		self.host.as_ref()
	}

	fn provider_present(&self) -> bool {
		self.host.ethereum().is_some_and(|p| p.is_metamask())
	}

	fn download_url(&self) -> &'static str {
		METAMASK_DOWNLOAD_URL
	}

	fn attach_listeners(&self) {
		let Ok(provider) = self.ethereum() else {
			warn!("MetaMask provider vanished before listeners were attached");
			return;
		};
		self.detach_listeners();

		let core = self.core.clone();
		let slot = Arc::downgrade(&self.attached);
		let subscription = provider.subscribe(Arc::new(move |event: &HostEvent| match event {
			HostEvent::AccountsChanged(accounts) => {
				debug!(?accounts, "MetaMask accounts changed");
				apply_accounts_changed(&core, accounts, |address| {
					format_evm_address(address).unwrap_or_else(|_| address.to_string())
				});
			}
			HostEvent::ChainChanged(chain_id) => apply_chain_changed(&core, chain_id),
			HostEvent::Disconnect => {
				if let Some(slot) = slot.upgrade() {
					release(&slot);
				}
				core.disconnect();
			}
		}));
		*self.attached.lock() = Some((provider, subscription));
	}

	fn detach_listeners(&self) {
		release(&self.attached);
	}
}

impl Drop for MetaMaskAdapter {
	fn drop(&mut self) {
		self.detach_listeners();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FakeEthereum, FakeHost};
	use wallet_types::AdapterEvent;

	const ADDRESS: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
	const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

	fn setup(chain_id: ChainId) -> (Arc<FakeEthereum>, MetaMaskAdapter) {
		let provider = Arc::new(FakeEthereum::with_account(ADDRESS, chain_id));
		let host = FakeHost::new().with_ethereum(provider.clone());
		let adapter = MetaMaskAdapter::new(Arc::new(host))
			.with_receipt_poll_interval(Duration::from_millis(1));
		(provider, adapter)
	}

	fn record(adapter: &MetaMaskAdapter) -> Arc<Mutex<Vec<AdapterEvent>>> {
		let log = Arc::new(Mutex::new(Vec::new()));
		let l = log.clone();
		adapter.events().on_all(move |e| l.lock().push(e.clone()));
		log
	}

	#[tokio::test]
	async fn test_connect_checksums_address() {
		let (provider, adapter) = setup(1);

		let account = adapter.connect(None).await.unwrap();

		assert_eq!(account.native_address, CHECKSUMMED);
		assert_eq!(account.universal_address, format!("1:{}", CHECKSUMMED));
		assert_eq!(adapter.state(), WalletState::Connected);
		assert_eq!(provider.listener_count(), 1);
	}

	#[tokio::test]
	async fn test_connect_switches_to_requested_chain() {
		let (provider, adapter) = setup(1);

		let account = adapter.connect(Some(137)).await.unwrap();

		assert_eq!(account.chain_id, 137);
		assert_eq!(
			provider.calls_to("wallet_switchEthereumChain"),
			vec![json!([{ "chainId": "0x89" }])]
		);
	}

	#[tokio::test]
	async fn test_connect_rejection() {
		let (provider, adapter) = setup(1);
		provider.respond_once("eth_requestAccounts", Err(ProviderRpcError::user_rejected()));

		let err = adapter.connect(None).await.unwrap_err();

		assert!(matches!(err, WalletError::ConnectionRejected { .. }));
		assert_eq!(adapter.state(), WalletState::Error);
		assert!(adapter.current_account().is_none());
	}

	#[tokio::test]
	async fn test_unavailable_without_metamask() {
		let provider = Arc::new(FakeEthereum::with_account(ADDRESS, 1).not_metamask());
		let adapter = MetaMaskAdapter::new(Arc::new(FakeHost::new().with_ethereum(provider)));
		assert!(!adapter.is_available().await);
		assert!(matches!(
			adapter.connect(None).await,
			Err(WalletError::NotAvailable { .. })
		));

		let headless = MetaMaskAdapter::new(Arc::new(crate::DetachedHost));
		assert!(!headless.is_available().await);
	}

	#[tokio::test]
	async fn test_unrecognized_chain_is_added_then_switched() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		provider.respond_once(
			"wallet_switchEthereumChain",
			Err(ProviderRpcError::new(ProviderRpcError::UNRECOGNIZED_CHAIN, "Unrecognized chain")),
		);
		let log = record(&adapter);

		adapter.switch_chain(56).await.unwrap();

		let added = provider.calls_to("wallet_addEthereumChain");
		assert_eq!(added.len(), 1);
		assert_eq!(added[0][0]["chainId"], "0x38");
		assert_eq!(added[0][0]["chainName"], "BNB Smart Chain");
		assert_eq!(provider.calls_to("wallet_switchEthereumChain").len(), 2);
		assert_eq!(*log.lock(), vec![AdapterEvent::ChainChanged(56)]);
		assert_eq!(adapter.current_account().unwrap().chain_id, 56);
	}

	#[tokio::test]
	async fn test_unrecognized_unknown_chain_is_not_supported() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		provider.respond(
			"wallet_switchEthereumChain",
			Err(ProviderRpcError::new(ProviderRpcError::UNRECOGNIZED_CHAIN, "Unrecognized chain")),
		);

		let err = adapter.switch_chain(999_999).await.unwrap_err();
		assert!(matches!(err, WalletError::ChainNotSupported { chain_id: 999_999, .. }));
	}

	#[tokio::test]
	async fn test_sign_message_and_rejection() {
		let (provider, adapter) = setup(1);
		assert!(matches!(
			adapter.sign_message("hi").await,
			Err(WalletError::NotConnected { .. })
		));

		adapter.connect(None).await.unwrap();
		provider.respond("personal_sign", Ok(json!("0xsig")));
		assert_eq!(adapter.sign_message("hi").await.unwrap(), "0xsig");
		assert_eq!(provider.calls_to("personal_sign")[0], json!(["hi", CHECKSUMMED]));

		provider.respond_once("personal_sign", Err(ProviderRpcError::user_rejected()));
		let err = adapter.sign_message("hi").await.unwrap_err();
		assert!(matches!(
			err,
			WalletError::SignatureRejected {
				target: SignatureTarget::Message,
				..
			}
		));
	}

	#[tokio::test]
	async fn test_write_rejection_names_transaction() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		provider.respond_once("eth_sendTransaction", Err(ProviderRpcError::user_rejected()));

		let abi = json!([{
			"type": "function",
			"name": "approve",
			"stateMutability": "nonpayable",
			"inputs": [{ "name": "spender", "type": "address" }, { "name": "amount", "type": "uint256" }],
			"outputs": [{ "name": "", "type": "bool" }]
		}]);
		let params: ContractWriteParams = ContractReadParams::new(CHECKSUMMED, abi, "approve")
			.with_args(vec![json!(CHECKSUMMED), json!("1")])
			.into();

		let err = adapter.write_contract(&params).await.unwrap_err();
		assert_eq!(err.to_string(), "Transaction was rejected by user");

		provider.respond("eth_sendTransaction", Ok(json!("0xhash")));
		assert_eq!(adapter.write_contract(&params).await.unwrap(), "0xhash");
		let sent = &provider.calls_to("eth_sendTransaction")[1][0];
		assert_eq!(sent["from"], CHECKSUMMED);
		assert!(sent["data"].as_str().unwrap().starts_with("0x095ea7b3"));
	}

	#[tokio::test]
	async fn test_wait_for_transaction_polls_until_mined() {
		let (provider, adapter) = setup(1);
		provider.respond_once("eth_getTransactionReceipt", Ok(Value::Null));
		provider.respond(
			"eth_getTransactionReceipt",
			Ok(json!({
				"transactionHash": "0xabc",
				"blockNumber": "0x10",
				"blockHash": "0xdef",
				"from": ADDRESS,
				"status": "0x1",
				"gasUsed": "0x5208"
			})),
		);
		provider.respond("eth_blockNumber", Ok(json!("0x11")));

		let receipt = adapter.wait_for_transaction("0xabc", 2).await.unwrap();

		assert_eq!(receipt.block_number, 16);
		assert_eq!(provider.calls_to("eth_getTransactionReceipt").len(), 2);
	}

	#[tokio::test]
	async fn test_reverted_receipt_fails() {
		let (provider, adapter) = setup(1);
		provider.respond(
			"eth_getTransactionReceipt",
			Ok(json!({ "blockNumber": "0x1", "gasUsed": "0x0", "status": "0x0" })),
		);

		let err = adapter.wait_for_transaction("0xabc", 1).await.unwrap_err();
		assert_eq!(err.to_string(), "Transaction 0xabc failed: Transaction reverted");
	}

	#[tokio::test]
	async fn test_host_events_are_translated() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		let log = record(&adapter);

		provider.emit(HostEvent::ChainChanged("0x89".to_string()));
		provider.emit(HostEvent::AccountsChanged(vec![]));

		assert_eq!(adapter.state(), WalletState::Disconnected);
		assert_eq!(
			*log.lock(),
			vec![AdapterEvent::ChainChanged(137), AdapterEvent::AccountChanged(None)]
		);
	}

	#[tokio::test]
	async fn test_disconnect_is_idempotent_and_detaches() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		let log = record(&adapter);

		adapter.disconnect().await.unwrap();
		adapter.disconnect().await.unwrap();

		assert_eq!(provider.listener_count(), 0);
		assert_eq!(
			*log.lock(),
			vec![AdapterEvent::Disconnected, AdapterEvent::Disconnected]
		);
	}

	#[tokio::test]
	async fn test_host_disconnect_releases_subscription() {
		let (provider, adapter) = setup(1);
		adapter.connect(None).await.unwrap();
		let log = record(&adapter);

		provider.emit(HostEvent::Disconnect);

		assert_eq!(adapter.state(), WalletState::Disconnected);
		assert_eq!(provider.listener_count(), 0);
		assert_eq!(*log.lock(), vec![AdapterEvent::Disconnected]);

		provider.emit(HostEvent::AccountsChanged(vec![ADDRESS.to_string()]));
		assert_eq!(log.lock().len(), 1);
	}

	#[tokio::test]
	async fn test_silent_accounts_use_eth_accounts() {
		let (provider, adapter) = setup(1);
		assert_eq!(adapter.silent_accounts().await, Some(vec![ADDRESS.to_string()]));
		assert!(provider.calls_to("eth_requestAccounts").is_empty());
	}
}
