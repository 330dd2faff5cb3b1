//! Fakes for host providers and a scripted adapter.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates' tests.

use crate::base::AdapterCore;
use crate::capabilities::{Capabilities, Capability};
use crate::host::{
	Eip1193Provider, HostEnvironment, HostEvent, HostEventSource, HostListener,
	HostSubscription, ProviderRpcError, TronWebProvider,
};
use crate::injected::apply_accounts_changed;
use crate::{unsupported, ProviderHandle, WalletAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use wallet_types::{
	Account, AddChainParams, ChainFamily, ChainId, ContractReadParams, ContractWriteParams,
	ReceiptStatus, Transaction, TransactionReceipt, WalletError, WalletKind, WalletResult,
	WalletState,
};

/// An in-memory [`HostEventSource`] that tests drive with [`FakeEventSource::emit`].
#[derive(Default)]
pub struct FakeEventSource {
	next_id: AtomicU64,
	listeners: Mutex<Vec<(HostSubscription, HostListener)>>,
}

impl FakeEventSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn emit(&self, event: HostEvent) {
		let listeners: Vec<HostListener> =
			self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
		for listener in listeners {
			listener(&event);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}
}

impl HostEventSource for FakeEventSource {
	fn subscribe(&self, listener: HostListener) -> HostSubscription {
		let id = HostSubscription(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.lock().push((id, listener));
		id
	}

	fn unsubscribe(&self, subscription: HostSubscription) {
		self.listeners.lock().retain(|(id, _)| *id != subscription);
	}
}

type RpcResult = Result<Value, ProviderRpcError>;

/// Scripted EIP-1193 provider.
///
/// Responses are looked up per method: queued one-shot responses first, then
/// the persistent response. Unscripted methods fail with code 4200.
pub struct FakeEthereum {
	events: FakeEventSource,
	is_metamask: bool,
	once: Mutex<HashMap<String, VecDeque<RpcResult>>>,
	persistent: Mutex<HashMap<String, RpcResult>>,
	calls: Mutex<Vec<(String, Value)>>,
}

impl FakeEthereum {
	pub fn new() -> Self {
		Self {
			events: FakeEventSource::new(),
			is_metamask: true,
			once: Mutex::new(HashMap::new()),
			persistent: Mutex::new(HashMap::new()),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// A provider with one authorized account on `chain_id` that accepts
	/// every prompt.
	pub fn with_account(address: &str, chain_id: ChainId) -> Self {
		let provider = Self::new();
		provider.respond("eth_requestAccounts", Ok(json!([address])));
		provider.respond("eth_accounts", Ok(json!([address])));
		provider.respond("eth_chainId", Ok(json!(format!("0x{:x}", chain_id))));
		provider.respond("wallet_switchEthereumChain", Ok(Value::Null));
		provider.respond("wallet_addEthereumChain", Ok(Value::Null));
		provider
	}

	pub fn not_metamask(mut self) -> Self {
		self.is_metamask = false;
		self
	}

	pub fn respond(&self, method: &str, result: RpcResult) {
		self.persistent.lock().insert(method.to_string(), result);
	}

	pub fn respond_once(&self, method: &str, result: RpcResult) {
		self.once
			.lock()
			.entry(method.to_string())
			.or_default()
			.push_back(result);
	}

	pub fn calls(&self) -> Vec<(String, Value)> {
		self.calls.lock().clone()
	}

	/// Parameters of every call to `method`, in order.
	pub fn calls_to(&self, method: &str) -> Vec<Value> {
		self.calls
			.lock()
			.iter()
			.filter(|(m, _)| m == method)
			.map(|(_, p)| p.clone())
			.collect()
	}

	pub fn emit(&self, event: HostEvent) {
		self.events.emit(event);
	}

	pub fn listener_count(&self) -> usize {
		self.events.listener_count()
	}
}

impl Default for FakeEthereum {
	fn default() -> Self {
		Self::new()
	}
}

impl HostEventSource for FakeEthereum {
	fn subscribe(&self, listener: HostListener) -> HostSubscription {
		self.events.subscribe(listener)
	}

	fn unsubscribe(&self, subscription: HostSubscription) {
		self.events.unsubscribe(subscription)
	}
}

#[async_trait]
impl Eip1193Provider for FakeEthereum {
	fn is_metamask(&self) -> bool {
		self.is_metamask
	}

	async fn request(&self, method: &str, params: Value) -> RpcResult {
		self.calls.lock().push((method.to_string(), params));

		if let Some(result) = self
			.once
			.lock()
			.get_mut(method)
			.and_then(VecDeque::pop_front)
		{
			return result;
		}
		self.persistent
			.lock()
			.get(method)
			.cloned()
			.unwrap_or_else(|| {
				Err(ProviderRpcError::new(
					4200,
					format!("Unsupported method: {}", method),
				))
			})
	}
}

/// Scripted TronWeb object.
pub struct FakeTronWeb {
	address: Mutex<Option<String>>,
	request_response: Mutex<RpcResult>,
	sign_message_v2: bool,
	sign_message_result: Mutex<Result<String, ProviderRpcError>>,
	sign_error: Mutex<Option<ProviderRpcError>>,
	calls: Mutex<Vec<String>>,
}

impl FakeTronWeb {
	pub fn new() -> Self {
		Self {
			address: Mutex::new(None),
			request_response: Mutex::new(Ok(json!({ "code": 200, "message": "ok" }))),
			sign_message_v2: true,
			sign_message_result: Mutex::new(Ok("0xtronmessagesig".to_string())),
			sign_error: Mutex::new(None),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn with_address(address: &str) -> Self {
		let tron = Self::new();
		tron.set_address(Some(address));
		tron
	}

	pub fn without_sign_message_v2(mut self) -> Self {
		self.sign_message_v2 = false;
		self
	}

	pub fn set_address(&self, address: Option<&str>) {
		*self.address.lock() = address.map(str::to_string);
	}

	pub fn respond_request(&self, result: RpcResult) {
		*self.request_response.lock() = result;
	}

	pub fn respond_sign_message(&self, result: Result<String, ProviderRpcError>) {
		*self.sign_message_result.lock() = result;
	}

	pub fn fail_sign(&self, error: ProviderRpcError) {
		*self.sign_error.lock() = Some(error);
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}
}

impl Default for FakeTronWeb {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl TronWebProvider for FakeTronWeb {
	async fn request(&self, method: &str, _params: Value) -> RpcResult {
		self.calls.lock().push(method.to_string());
		self.request_response.lock().clone()
	}

	fn default_address(&self) -> Option<String> {
		self.address.lock().clone()
	}

	fn supports_sign_message_v2(&self) -> bool {
		self.sign_message_v2
	}

	async fn sign_message_v2(&self, _message: &str) -> Result<String, ProviderRpcError> {
		self.calls.lock().push("signMessageV2".to_string());
		self.sign_message_result.lock().clone()
	}

	/// Objects come back with a `signature` list appended, strings are
	/// answered with a fixed legacy signature.
	async fn sign(&self, payload: Value) -> RpcResult {
		self.calls.lock().push("sign".to_string());
		if let Some(error) = self.sign_error.lock().clone() {
			return Err(error);
		}
		match payload {
			Value::Object(mut tx) => {
				tx.insert("signature".to_string(), json!(["0xtronsig"]));
				Ok(Value::Object(tx))
			}
			_ => Ok(json!("0xlegacysig")),
		}
	}
}

/// A host whose globals are supplied by the test.
#[derive(Clone)]
pub struct FakeHost {
	dom: bool,
	ethereum: Option<Arc<FakeEthereum>>,
	tron_web: Option<Arc<FakeTronWeb>>,
	tron_link_events: Option<Arc<FakeEventSource>>,
}

impl FakeHost {
	/// A browser-like host with no wallets installed.
	pub fn new() -> Self {
		Self {
			dom: true,
			ethereum: None,
			tron_web: None,
			tron_link_events: None,
		}
	}

	pub fn without_dom(mut self) -> Self {
		self.dom = false;
		self
	}

	pub fn with_ethereum(mut self, provider: Arc<FakeEthereum>) -> Self {
		self.ethereum = Some(provider);
		self
	}

	pub fn with_tron_web(mut self, tron_web: Arc<FakeTronWeb>) -> Self {
		self.tron_web = Some(tron_web);
		self
	}

	pub fn with_tron_link_events(mut self, source: Arc<FakeEventSource>) -> Self {
		self.tron_link_events = Some(source);
		self
	}
}

impl Default for FakeHost {
	fn default() -> Self {
		Self::new()
	}
}

impl HostEnvironment for FakeHost {
	fn has_dom(&self) -> bool {
		self.dom
	}

	fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
		self.ethereum
			.clone()
			.map(|p| p as Arc<dyn Eip1193Provider>)
	}

	fn tron_web(&self) -> Option<Arc<dyn TronWebProvider>> {
		self.tron_web
			.clone()
			.map(|t| t as Arc<dyn TronWebProvider>)
	}

	fn tron_link_events(&self) -> Option<Arc<dyn HostEventSource>> {
		self.tron_link_events
			.clone()
			.map(|s| s as Arc<dyn HostEventSource>)
	}
}

/// An adapter whose behaviour is fixed up front, for manager tests.
pub struct ScriptedAdapter {
	core: AdapterCore,
	family: ChainFamily,
	name: String,
	address: String,
	default_chain: ChainId,
	capabilities: Capabilities,
	available: AtomicBool,
	connect_error: Mutex<Option<WalletError>>,
	silent_accounts: Mutex<Option<Vec<String>>>,
	switch_failures: AtomicUsize,
	added_chains: Mutex<Vec<AddChainParams>>,
	connects: AtomicUsize,
	disconnects: AtomicUsize,
}

impl ScriptedAdapter {
	pub fn new(kind: WalletKind, family: ChainFamily, address: &str, default_chain: ChainId) -> Self {
		Self {
			name: format!("Scripted {}", kind),
			core: AdapterCore::new(kind),
			family,
			address: address.to_string(),
			default_chain,
			capabilities: Capabilities::all().without(Capability::Signer),
			available: AtomicBool::new(true),
			connect_error: Mutex::new(None),
			silent_accounts: Mutex::new(None),
			switch_failures: AtomicUsize::new(0),
			added_chains: Mutex::new(Vec::new()),
			connects: AtomicUsize::new(0),
			disconnects: AtomicUsize::new(0),
		}
	}

	/// An EVM-family adapter defaulting to chain 1.
	pub fn evm(kind: WalletKind, address: &str) -> Self {
		Self::new(kind, ChainFamily::Evm, address, 1)
	}

	/// A Tron-family adapter defaulting to chain 195 that can only sign.
	pub fn tron(kind: WalletKind, address: &str) -> Self {
		Self::new(kind, ChainFamily::Tron, address, 195)
			.with_capabilities(Capabilities::empty().with(Capability::SignTransaction))
	}

	pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
		self.capabilities = capabilities;
		self
	}

	pub fn with_silent_accounts(self, accounts: Vec<String>) -> Self {
		*self.silent_accounts.lock() = Some(accounts);
		self
	}

	pub fn set_available(&self, available: bool) {
		self.available.store(available, Ordering::SeqCst);
	}

	pub fn fail_connect(&self, error: WalletError) {
		*self.connect_error.lock() = Some(error);
	}

	/// Makes the next `count` chain switches fail as an unrecognized chain.
	pub fn fail_next_switches(&self, count: usize) {
		self.switch_failures.store(count, Ordering::SeqCst);
	}

	pub fn simulate_accounts_changed(&self, accounts: &[&str]) {
		let accounts: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
		apply_accounts_changed(&self.core, &accounts, str::to_string);
	}

	pub fn simulate_chain_changed(&self, chain_id: ChainId) {
		self.core.change_chain(chain_id);
	}

	pub fn simulate_disconnect(&self) {
		self.core.disconnect();
	}

	pub fn simulate_error(&self, error: WalletError) {
		self.core.emit_error(error);
	}

	pub fn connect_count(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	pub fn disconnect_count(&self) -> usize {
		self.disconnects.load(Ordering::SeqCst)
	}

	pub fn added_chains(&self) -> Vec<AddChainParams> {
		self.added_chains.lock().clone()
	}

	fn require(&self, capability: Capability) -> WalletResult<()> {
		if self.capabilities.supports(capability) {
			Ok(())
		} else {
			Err(unsupported(capability, self.core.kind()))
		}
	}
}

#[async_trait]
impl WalletAdapter for ScriptedAdapter {
	fn core(&self) -> &AdapterCore {
		&self.core
	}

	fn chain_family(&self) -> ChainFamily {
		self.family
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	async fn connect(&self, chain_id: Option<ChainId>) -> WalletResult<Account> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		self.core.set_state(WalletState::Connecting);

		if let Some(error) = self.connect_error.lock().clone() {
			self.core.reset(WalletState::Error);
			return Err(error);
		}

		let account = Account::new(
			chain_id.unwrap_or(self.default_chain),
			self.address.clone(),
			self.family,
		);
		self.core.set_connected(account.clone());
		Ok(account)
	}

	async fn disconnect(&self) -> WalletResult<()> {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
		self.core.disconnect();
		Ok(())
	}

	async fn is_available(&self) -> bool {
		self.available.load(Ordering::SeqCst)
	}

	async fn sign_message(&self, message: &str) -> WalletResult<String> {
		let account = self.ensure_connected()?;
		Ok(format!("signed:{}:{}", account.native_address, message))
	}

	async fn silent_accounts(&self) -> Option<Vec<String>> {
		self.silent_accounts.lock().clone()
	}

	fn provider(&self) -> ProviderHandle {
		ProviderHandle::Unavailable
	}

	async fn sign_transaction(&self, _transaction: &Transaction) -> WalletResult<String> {
		self.require(Capability::SignTransaction)?;
		self.ensure_connected()?;
		Ok("0xsignedtransaction".to_string())
	}

	async fn sign_typed_data(&self, _typed_data: &Value) -> WalletResult<String> {
		self.require(Capability::SignTypedData)?;
		self.ensure_connected()?;
		Ok("0xsignedtypeddata".to_string())
	}

	async fn switch_chain(&self, chain_id: ChainId) -> WalletResult<()> {
		self.require(Capability::SwitchChain)?;
		self.ensure_connected()?;

		let pending_failure = self
			.switch_failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
			.is_ok();
		if pending_failure {
			return Err(WalletError::Provider {
				code: Some(ProviderRpcError::UNRECOGNIZED_CHAIN),
				message: format!("Unrecognized chain ID {}", chain_id),
			});
		}

		self.core.change_chain(chain_id);
		Ok(())
	}

	async fn add_chain(&self, params: &AddChainParams) -> WalletResult<()> {
		self.require(Capability::AddChain)?;
		self.added_chains.lock().push(params.clone());
		Ok(())
	}

	async fn read_contract(&self, params: &ContractReadParams) -> WalletResult<Value> {
		self.require(Capability::ReadContract)?;
		Ok(json!({ "function": params.function_name, "args": params.args }))
	}

	async fn write_contract(&self, _params: &ContractWriteParams) -> WalletResult<String> {
		self.require(Capability::WriteContract)?;
		self.ensure_connected()?;
		Ok("0xtransactionhash".to_string())
	}

	async fn estimate_gas(&self, _params: &ContractWriteParams) -> WalletResult<u64> {
		self.require(Capability::EstimateGas)?;
		Ok(21_000)
	}

	async fn wait_for_transaction(
		&self,
		tx_hash: &str,
		_confirmations: u64,
	) -> WalletResult<TransactionReceipt> {
		self.require(Capability::WaitForTransaction)?;
		Ok(TransactionReceipt {
			transaction_hash: tx_hash.to_string(),
			block_number: 1,
			block_hash: "0xblock".to_string(),
			from: self.address.clone(),
			to: None,
			status: ReceiptStatus::Success,
			gas_used: "21000".to_string(),
			effective_gas_price: None,
			logs: Vec::new(),
		})
	}
}
