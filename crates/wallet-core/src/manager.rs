//! The wallet manager.
//!
//! The manager pools at most one connected adapter per chain family and
//! designates one of them as primary. Operations without an explicit chain
//! family are routed to the primary wallet. Adapter events are re-published
//! as manager events, and every change to the pool is persisted as a
//! [`StorageData`] snapshot when storage is enabled.

use crate::config::WalletManagerConfig;
use crate::detection::wallet_metadata;
use crate::event_bus::EventBus;
use crate::registry::AdapterRegistry;
use crate::snapshot::{HistoryRecord, SnapshotStore, StorageData};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use wallet_adapters::{Capability, PrivateKeyAdapter, ProviderHandle, WalletAdapter};
use wallet_storage::StorageService;
use wallet_types::address::universal::address_of;
use wallet_types::{
	Account, AddChainParams, AdapterEvent, ChainFamily, ChainId, ChainRegistry,
	ContractReadParams, ContractWriteParams, ListenerId, ManagerEvent, ManagerEventKind,
	EventEmitter, Transaction, TransactionReceipt, WalletError, WalletKind, WalletResult,
};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A pooled wallet as reported by [`WalletManager::connected_wallets`].
#[derive(Clone)]
pub struct ConnectedWallet {
	pub account: Account,
	pub wallet_kind: WalletKind,
	pub chain_family: ChainFamily,
	pub is_primary: bool,
	pub can_switch_chain: bool,
	pub adapter: Arc<dyn WalletAdapter>,
}

impl std::fmt::Debug for ConnectedWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectedWallet")
			.field("account", &self.account)
			.field("wallet_kind", &self.wallet_kind)
			.field("chain_family", &self.chain_family)
			.field("is_primary", &self.is_primary)
			.field("can_switch_chain", &self.can_switch_chain)
			.finish_non_exhaustive()
	}
}

/// Options for [`WalletManager::request_switch_chain`].
#[derive(Debug, Clone, Default)]
pub struct SwitchChainOptions {
	/// Add the chain and retry once when the switch fails.
	pub add_chain_if_missing: bool,
	pub chain_config: Option<AddChainParams>,
}

struct PooledWallet {
	adapter: Arc<dyn WalletAdapter>,
	subscription: ListenerId,
	/// Whether the wallet appears in saved snapshots.
	persist: bool,
}

#[derive(Default)]
struct PoolState {
	wallets: BTreeMap<ChainFamily, PooledWallet>,
	/// Always a key of `wallets` when set.
	primary: Option<ChainFamily>,
}

struct Inner {
	config: WalletManagerConfig,
	registry: AdapterRegistry,
	chains: ChainRegistry,
	state: Mutex<PoolState>,
	events: EventEmitter<ManagerEvent>,
	bus: EventBus,
	snapshots: Option<SnapshotStore>,
}

fn same_adapter(a: &Arc<dyn WalletAdapter>, b: &Arc<dyn WalletAdapter>) -> bool {
	std::ptr::eq(
		Arc::as_ptr(a) as *const (),
		Arc::as_ptr(b) as *const (),
	)
}

fn same_address(family: ChainFamily, a: &str, b: &str) -> bool {
	match family {
		ChainFamily::Evm => a.eq_ignore_ascii_case(b),
		_ => a == b,
	}
}

fn require(adapter: &Arc<dyn WalletAdapter>, capability: Capability) -> WalletResult<()> {
	if adapter.capabilities().supports(capability) {
		Ok(())
	} else {
		Err(wallet_adapters::unsupported(capability, &adapter.kind()))
	}
}

impl Inner {
	fn emit(&self, event: ManagerEvent) {
		self.events.emit(&event);
		self.bus.publish(event).ok();
	}

	/// Whether `adapter` is the pooled wallet for `family`, and if so whether
	/// it is the primary one.
	fn role_of(&self, family: ChainFamily, adapter: &Arc<dyn WalletAdapter>) -> Option<bool> {
		let state = self.state.lock();
		let pooled = state.wallets.get(&family)?;
		if !same_adapter(&pooled.adapter, adapter) {
			return None;
		}
		Some(state.primary == Some(family))
	}

	fn subscribe(inner: &Arc<Inner>, adapter: &Arc<dyn WalletAdapter>) -> ListenerId {
		let family = adapter.chain_family();
		let weak_inner = Arc::downgrade(inner);
		let weak_adapter = Arc::downgrade(adapter);

		adapter.events().on_all(move |event| {
			let (Some(inner), Some(adapter)) = (weak_inner.upgrade(), weak_adapter.upgrade())
			else {
				return;
			};
			Inner::on_adapter_event(&inner, family, &adapter, event);
		})
	}

	fn on_adapter_event(
		inner: &Arc<Inner>,
		family: ChainFamily,
		adapter: &Arc<dyn WalletAdapter>,
		event: &AdapterEvent,
	) {
		match event {
			AdapterEvent::AccountChanged(account) => {
				let Some(is_primary) = inner.role_of(family, adapter) else {
					debug!(%family, "Ignoring account change from unpooled adapter");
					return;
				};
				if is_primary {
					inner.emit(ManagerEvent::AccountChanged(account.clone()));
				}
				inner.emit(ManagerEvent::WalletAccountChanged {
					family,
					account: account.clone(),
					is_primary,
				});
				Inner::spawn_save(inner);
			}
			AdapterEvent::ChainChanged(chain_id) => {
				let Some(is_primary) = inner.role_of(family, adapter) else {
					return;
				};
				let Some(account) = adapter.current_account() else {
					debug!(%family, chain_id, "Chain changed without an account");
					return;
				};
				if is_primary {
					inner.emit(ManagerEvent::ChainChanged {
						chain_id: *chain_id,
						account: account.clone(),
					});
				}
				inner.emit(ManagerEvent::WalletChainChanged {
					family,
					chain_id: *chain_id,
					account,
					is_primary,
				});
				Inner::spawn_save(inner);
			}
			AdapterEvent::Disconnected => {
				let removed = {
					let mut state = inner.state.lock();
					let pooled_here = state
						.wallets
						.get(&family)
						.is_some_and(|pooled| same_adapter(&pooled.adapter, adapter));
					if pooled_here {
						let was_primary = state.primary == Some(family);
						if was_primary {
							state.primary = None;
						}
						state
							.wallets
							.remove(&family)
							.map(|pooled| (pooled.subscription, was_primary))
					} else {
						None
					}
				};
				let Some((subscription, was_primary)) = removed else {
					return;
				};

				adapter.events().off(subscription);
				info!(%family, was_primary, "Wallet disconnected by provider");

				if was_primary {
					inner.emit(ManagerEvent::Disconnected);
				}
				inner.emit(ManagerEvent::WalletDisconnected {
					family,
					is_primary: was_primary,
				});
				Inner::spawn_save(inner);
			}
			AdapterEvent::Error(error) => {
				if inner.role_of(family, adapter).is_some() {
					inner.emit(ManagerEvent::Error(error.clone()));
				}
			}
		}
	}

	/// Pools `adapter` under its chain family, replacing and unsubscribing
	/// any previous entry for that family.
	fn install(inner: &Arc<Inner>, adapter: Arc<dyn WalletAdapter>, as_primary: bool, persist: bool) {
		let family = adapter.chain_family();
		let subscription = Inner::subscribe(inner, &adapter);

		let superseded = {
			let mut state = inner.state.lock();
			let previous = state.wallets.insert(
				family,
				PooledWallet {
					adapter,
					subscription,
					persist,
				},
			);
			if as_primary {
				state.primary = Some(family);
			}
			previous
		};

		if let Some(previous) = superseded {
			previous.adapter.events().off(previous.subscription);
			debug!(%family, kind = %previous.adapter.kind(), "Superseded pooled wallet");
		}
	}

	fn build_snapshot(&self) -> StorageData {
		let state = self.state.lock();
		let now = chrono::Utc::now().timestamp_millis();

		let primary = state
			.primary
			.and_then(|family| state.wallets.get(&family))
			.filter(|pooled| pooled.persist)
			.and_then(|pooled| {
				pooled
					.adapter
					.current_account()
					.map(|account| (pooled.adapter.kind(), account))
			});

		let history = state
			.wallets
			.values()
			.filter(|pooled| pooled.persist)
			.filter_map(|pooled| {
				let account = pooled.adapter.current_account()?;
				Some(HistoryRecord {
					universal_address: account.universal_address,
					native_address: account.native_address,
					chain_id: account.chain_id,
					chain_family: account.chain_family,
					wallet_kind: pooled.adapter.kind(),
					last_connected_at: now,
					name: account.name,
				})
			})
			.collect();

		match primary {
			Some((kind, account)) => StorageData {
				current: Some(account.universal_address),
				primary_wallet_kind: Some(kind),
				primary_chain_id: Some(account.chain_id),
				history,
			},
			None => StorageData {
				history,
				..StorageData::default()
			},
		}
	}

	async fn save(&self) {
		let Some(snapshots) = &self.snapshots else {
			return;
		};
		if let Err(e) = snapshots.save_with(|| self.build_snapshot()).await {
			warn!(error = %e, "Failed to save wallet snapshot");
		}
	}

	/// Saves from a synchronous event listener.
	fn spawn_save(inner: &Arc<Inner>) {
		if inner.snapshots.is_none() {
			return;
		}
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				let inner = inner.clone();
				handle.spawn(async move {
					inner.save().await;
				});
			}
			Err(_) => warn!("No tokio runtime, wallet snapshot not saved"),
		}
	}
}

/// Tracks pooled wallet connections and routes operations to them.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct WalletManager {
	inner: Arc<Inner>,
}

impl WalletManager {
	/// Creates a manager. `storage` is only used when
	/// [`WalletManagerConfig::enable_storage`] is set.
	pub fn new(
		config: WalletManagerConfig,
		registry: AdapterRegistry,
		storage: Option<Arc<StorageService>>,
	) -> Self {
		WalletManagerBuilder::new(config)
			.with_registry(registry)
			.with_storage_service(storage)
			.build()
	}

	pub fn builder(config: WalletManagerConfig) -> WalletManagerBuilder {
		WalletManagerBuilder::new(config)
	}

	pub fn config(&self) -> &WalletManagerConfig {
		&self.inner.config
	}

	pub fn registry(&self) -> &AdapterRegistry {
		&self.inner.registry
	}

	pub fn chains(&self) -> &ChainRegistry {
		&self.inner.chains
	}

	// ===== Events =====

	pub fn on<F>(&self, kind: ManagerEventKind, listener: F) -> ListenerId
	where
		F: Fn(&ManagerEvent) + Send + Sync + 'static,
	{
		self.inner.events.on(kind, listener)
	}

	pub fn on_all<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&ManagerEvent) + Send + Sync + 'static,
	{
		self.inner.events.on_all(listener)
	}

	pub fn off(&self, id: ListenerId) -> bool {
		self.inner.events.off(id)
	}

	pub fn remove_all_listeners(&self, kind: Option<ManagerEventKind>) {
		self.inner.events.remove_all_listeners(kind);
	}

	/// Receives every manager event published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
		self.inner.bus.subscribe()
	}

	// ===== Connection =====

	async fn available_adapter(&self, kind: &WalletKind) -> WalletResult<Arc<dyn WalletAdapter>> {
		let not_available = || {
			WalletError::not_available(kind, wallet_metadata(kind).and_then(|m| m.download_url))
		};

		let adapter = self.inner.registry.get_adapter(kind).ok_or_else(not_available)?;
		if !adapter.is_available().await {
			return Err(not_available());
		}
		Ok(adapter)
	}

	/// Connects a wallet and makes it the primary one.
	pub async fn connect(&self, kind: &WalletKind, chain_id: Option<ChainId>) -> WalletResult<Account> {
		let adapter = self.available_adapter(kind).await?;
		let account = adapter.connect(chain_id).await?;
		info!(%kind, address = %account.universal_address, "Connected primary wallet");

		Inner::install(&self.inner, adapter, true, true);
		self.inner.save().await;
		Ok(account)
	}

	/// Connects a wallet without changing the primary designation.
	///
	/// A wallet already pooled for the same chain family is replaced but
	/// not disconnected. When that wallet was the primary one, the new
	/// wallet takes over as primary.
	pub async fn connect_additional(
		&self,
		kind: &WalletKind,
		chain_id: Option<ChainId>,
	) -> WalletResult<Account> {
		let adapter = self.available_adapter(kind).await?;
		let account = adapter.connect(chain_id).await?;
		info!(%kind, address = %account.universal_address, "Connected additional wallet");

		Inner::install(&self.inner, adapter, false, true);
		self.inner.save().await;
		Ok(account)
	}

	/// Connects a local private-key signer as the primary wallet.
	///
	/// The key is never persisted and the wallet is left out of snapshots.
	/// The stored snapshot is left as it was, so a browser wallet saved
	/// earlier can still be restored.
	pub async fn connect_with_private_key(
		&self,
		private_key: &str,
		chain_id: Option<ChainId>,
	) -> WalletResult<Account> {
		let adapter = PrivateKeyAdapter::new().with_chains(self.inner.chains.clone());
		adapter.set_private_key(private_key);

		let adapter: Arc<dyn WalletAdapter> = Arc::new(adapter);
		let account = adapter
			.connect(Some(chain_id.unwrap_or(self.inner.config.default_chain_id)))
			.await?;
		info!(address = %account.universal_address, "Connected private key wallet");

		Inner::install(&self.inner, adapter, true, false);
		Ok(account)
	}

	/// Disconnects the primary wallet. Does nothing without one.
	///
	/// The pool is updated before the adapter is asked to disconnect, so an
	/// adapter error is returned with the bookkeeping already cleared.
	pub async fn disconnect(&self) -> WalletResult<()> {
		let removed = {
			let mut state = self.inner.state.lock();
			state
				.primary
				.take()
				.and_then(|family| state.wallets.remove(&family).map(|pooled| (family, pooled)))
		};
		let Some((family, pooled)) = removed else {
			return Ok(());
		};

		pooled.adapter.events().off(pooled.subscription);
		let result = pooled.adapter.disconnect().await;
		info!(%family, kind = %pooled.adapter.kind(), "Disconnected primary wallet");

		self.inner.save().await;
		self.inner.emit(ManagerEvent::Disconnected);
		result
	}

	/// Disconnects every pooled wallet and clears the stored snapshot.
	pub async fn disconnect_all(&self) {
		let drained = {
			let mut state = self.inner.state.lock();
			state.primary = None;
			std::mem::take(&mut state.wallets)
		};

		for (family, pooled) in &drained {
			pooled.adapter.events().off(pooled.subscription);
			if let Err(e) = pooled.adapter.disconnect().await {
				warn!(%family, error = %e, "Adapter failed to disconnect cleanly");
			}
		}

		if let Some(snapshots) = &self.inner.snapshots {
			if let Err(e) = snapshots.clear().await {
				warn!(error = %e, "Failed to clear wallet snapshot");
			}
		}
		info!(wallets = drained.len(), "Disconnected all wallets");
		self.inner.emit(ManagerEvent::Disconnected);
	}

	/// Makes the pooled wallet of `family` the primary one.
	pub async fn switch_primary_wallet(&self, family: ChainFamily) -> WalletResult<Account> {
		let (new_primary, old_primary) = {
			let mut guard = self.inner.state.lock();
			let state = &mut *guard;
			let new_primary = state
				.wallets
				.get(&family)
				.and_then(|pooled| pooled.adapter.current_account())
				.ok_or_else(|| WalletError::family_not_connected(family))?;
			let old_primary = state
				.primary
				.and_then(|current| state.wallets.get(&current))
				.and_then(|pooled| pooled.adapter.current_account());
			state.primary = Some(family);
			(new_primary, old_primary)
		};
		info!(%family, address = %new_primary.universal_address, "Switched primary wallet");

		self.inner.save().await;
		self.inner.emit(ManagerEvent::PrimaryWalletSwitched {
			new_primary: new_primary.clone(),
			old_primary,
			family,
		});
		Ok(new_primary)
	}

	// ===== Queries =====

	pub fn primary_account(&self) -> Option<Account> {
		self.primary_wallet()
			.and_then(|adapter| adapter.current_account())
	}

	pub fn primary_wallet(&self) -> Option<Arc<dyn WalletAdapter>> {
		let state = self.inner.state.lock();
		state
			.primary
			.and_then(|family| state.wallets.get(&family))
			.map(|pooled| pooled.adapter.clone())
	}

	pub fn primary_chain_family(&self) -> Option<ChainFamily> {
		self.inner.state.lock().primary
	}

	/// Pooled wallets that currently hold an account, ordered by chain family.
	pub fn connected_wallets(&self) -> Vec<ConnectedWallet> {
		let state = self.inner.state.lock();
		state
			.wallets
			.iter()
			.filter_map(|(family, pooled)| {
				let account = pooled.adapter.current_account()?;
				Some(ConnectedWallet {
					account,
					wallet_kind: pooled.adapter.kind(),
					chain_family: *family,
					is_primary: state.primary == Some(*family),
					can_switch_chain: pooled
						.adapter
						.capabilities()
						.supports(Capability::SwitchChain),
					adapter: pooled.adapter.clone(),
				})
			})
			.collect()
	}

	pub fn wallet_by_chain_family(&self, family: ChainFamily) -> Option<Arc<dyn WalletAdapter>> {
		self.inner
			.state
			.lock()
			.wallets
			.get(&family)
			.map(|pooled| pooled.adapter.clone())
	}

	/// The primary wallet, or the pooled wallet of `family` when given.
	fn target(&self, family: Option<ChainFamily>) -> WalletResult<Arc<dyn WalletAdapter>> {
		match family {
			None => self.primary_wallet().ok_or_else(WalletError::no_wallet),
			Some(family) => self
				.wallet_by_chain_family(family)
				.ok_or_else(|| WalletError::family_not_connected(family)),
		}
	}

	// ===== Signing =====

	pub async fn sign_message(&self, message: &str) -> WalletResult<String> {
		self.sign_message_with_chain_family(message, None).await
	}

	pub async fn sign_message_with_chain_family(
		&self,
		message: &str,
		family: Option<ChainFamily>,
	) -> WalletResult<String> {
		self.target(family)?.sign_message(message).await
	}

	/// Signs EIP-712 typed data.
	pub async fn sign_typed_data(
		&self,
		typed_data: &Value,
		family: Option<ChainFamily>,
	) -> WalletResult<String> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::SignTypedData)?;
		adapter.sign_typed_data(typed_data).await
	}

	pub async fn sign_transaction(&self, transaction: &Transaction) -> WalletResult<String> {
		self.sign_transaction_with_chain_family(transaction, None).await
	}

	pub async fn sign_transaction_with_chain_family(
		&self,
		transaction: &Transaction,
		family: Option<ChainFamily>,
	) -> WalletResult<String> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::SignTransaction)?;
		adapter.sign_transaction(transaction).await
	}

	// ===== Chain switching =====

	/// Switches the primary wallet to `chain_id` and returns its account.
	///
	/// When the switch fails and `options` opt into adding the chain, the
	/// chain is added and the switch retried once.
	pub async fn request_switch_chain(
		&self,
		chain_id: ChainId,
		options: SwitchChainOptions,
	) -> WalletResult<Account> {
		let adapter = self.target(None)?;
		require(&adapter, Capability::SwitchChain)?;

		if let Err(error) = adapter.switch_chain(chain_id).await {
			let add_chain = match &options.chain_config {
				Some(config)
					if options.add_chain_if_missing
						&& adapter.capabilities().supports(Capability::AddChain) =>
				{
					config
				}
				_ => return Err(error),
			};

			debug!(chain_id, error = %error, "Switch failed, adding chain and retrying");
			adapter.add_chain(add_chain).await?;
			adapter.switch_chain(chain_id).await?;
		}

		adapter.ensure_connected()
	}

	// ===== Contracts =====

	pub async fn read_contract(
		&self,
		params: &ContractReadParams,
		family: Option<ChainFamily>,
	) -> WalletResult<Value> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::ReadContract)?;
		adapter.read_contract(params).await
	}

	/// Sends a contract transaction and returns its hash.
	pub async fn write_contract(
		&self,
		params: &ContractWriteParams,
		family: Option<ChainFamily>,
	) -> WalletResult<String> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::WriteContract)?;
		adapter.write_contract(params).await
	}

	pub async fn estimate_gas(
		&self,
		params: &ContractWriteParams,
		family: Option<ChainFamily>,
	) -> WalletResult<u64> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::EstimateGas)?;
		adapter.estimate_gas(params).await
	}

	/// Waits for `confirmations` blocks (at least one) on top of the
	/// transaction's block.
	pub async fn wait_for_transaction(
		&self,
		tx_hash: &str,
		confirmations: Option<u64>,
		family: Option<ChainFamily>,
	) -> WalletResult<TransactionReceipt> {
		let adapter = self.target(family)?;
		require(&adapter, Capability::WaitForTransaction)?;
		adapter
			.wait_for_transaction(tx_hash, confirmations.unwrap_or(1).max(1))
			.await
	}

	// ===== Providers =====

	pub fn provider(&self) -> WalletResult<ProviderHandle> {
		self.target(None).map(|adapter| adapter.provider())
	}

	pub fn provider_by_chain_family(&self, family: ChainFamily) -> WalletResult<ProviderHandle> {
		self.target(Some(family)).map(|adapter| adapter.provider())
	}

	// ===== Restoration =====

	/// Reconnects the primary wallet recorded in storage.
	///
	/// Returns `None` whenever nothing could be restored; errors are logged
	/// and never returned. A successful restore emits `AccountChanged` but
	/// does not save a new snapshot.
	pub async fn restore_from_storage(&self) -> Option<Account> {
		let snapshots = self.inner.snapshots.as_ref()?;
		let data = snapshots.load().await?;

		let (Some(kind), Some(current)) = (data.primary_wallet_kind, data.current) else {
			debug!("Missing primary wallet info in storage");
			return None;
		};
		let Some(adapter) = self.inner.registry.get_adapter(&kind) else {
			debug!(%kind, "No adapter registered for stored wallet");
			return None;
		};
		if !adapter.is_available().await {
			debug!(%kind, "Stored wallet is not available");
			return None;
		}

		if let Some(authorized) = adapter.silent_accounts().await {
			let saved = address_of(&current);
			let matches = match (authorized.first(), saved.as_deref()) {
				(Some(top), Some(saved)) => same_address(adapter.chain_family(), top, saved),
				_ => false,
			};

			if matches {
				debug!(%kind, "Stored address is still authorized, reconnecting");
				return match adapter.connect(data.primary_chain_id).await {
					Ok(account) => Some(self.adopt_restored(adapter, account)),
					Err(e) => {
						debug!(%kind, error = %e, "Silent reconnection failed");
						None
					}
				};
			}
			debug!(%kind, "Stored address not authorized, trying normal connect");
		}

		match adapter.connect(data.primary_chain_id).await {
			Ok(account) => Some(self.adopt_restored(adapter, account)),
			Err(e) => {
				debug!(%kind, error = %e, "Failed to restore wallet from storage");
				None
			}
		}
	}

	fn adopt_restored(&self, adapter: Arc<dyn WalletAdapter>, account: Account) -> Account {
		info!(kind = %adapter.kind(), address = %account.universal_address, "Restored wallet");
		Inner::install(&self.inner, adapter, true, true);
		self.inner
			.emit(ManagerEvent::AccountChanged(Some(account.clone())));
		account
	}
}

/// Builder for [`WalletManager`].
pub struct WalletManagerBuilder {
	config: WalletManagerConfig,
	registry: AdapterRegistry,
	chains: ChainRegistry,
	storage: Option<Arc<StorageService>>,
	event_capacity: usize,
}

impl WalletManagerBuilder {
	pub fn new(config: WalletManagerConfig) -> Self {
		Self {
			config,
			registry: AdapterRegistry::new(),
			chains: ChainRegistry::new(),
			storage: None,
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}

	pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
		self.registry = registry;
		self
	}

	pub fn with_adapter_factory<F>(mut self, kind: WalletKind, factory: F) -> Self
	where
		F: Fn() -> Arc<dyn WalletAdapter> + Send + Sync + 'static,
	{
		self.registry.register(kind, factory);
		self
	}

	/// Chain metadata used by manager-built adapters.
	pub fn with_chains(mut self, chains: ChainRegistry) -> Self {
		self.chains = chains;
		self
	}

	pub fn with_storage(mut self, storage: Arc<StorageService>) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn with_storage_service(mut self, storage: Option<Arc<StorageService>>) -> Self {
		self.storage = storage;
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity.max(1);
		self
	}

	pub fn build(self) -> WalletManager {
		let snapshots = match self.storage {
			Some(storage) if self.config.enable_storage => {
				Some(SnapshotStore::new(storage, self.config.storage_key()))
			}
			_ => None,
		};

		WalletManager {
			inner: Arc::new(Inner {
				config: self.config,
				registry: self.registry,
				chains: self.chains,
				state: Mutex::new(PoolState::default()),
				events: EventEmitter::new(),
				bus: EventBus::new(self.event_capacity),
				snapshots,
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wallet_adapters::testing::ScriptedAdapter;
	use wallet_storage::MemoryStorage;

	const EVM_ADDRESS: &str = "0xABC0000000000000000000000000000000000001";

	fn manager_with(adapter: impl Fn() -> ScriptedAdapter + Send + Sync + 'static) -> WalletManager {
		WalletManager::builder(WalletManagerConfig::default())
			.with_adapter_factory(WalletKind::MetaMask, move || Arc::new(adapter()))
			.build()
	}

	#[tokio::test]
	async fn test_connect_unregistered_kind_is_not_available() {
		let manager = WalletManager::builder(WalletManagerConfig::default()).build();

		let err = manager.connect(&WalletKind::TronLink, None).await.unwrap_err();
		match err {
			WalletError::NotAvailable { download_url, .. } => {
				assert_eq!(download_url.as_deref(), Some("https://www.tronlink.org/"))
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_connect_unavailable_wallet_fails() {
		let manager = manager_with(|| {
			let adapter = ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS);
			adapter.set_available(false);
			adapter
		});

		let err = manager.connect(&WalletKind::MetaMask, None).await.unwrap_err();
		assert_eq!(err.code(), "WALLET_NOT_AVAILABLE");
		assert!(manager.primary_account().is_none());
	}

	#[tokio::test]
	async fn test_connect_error_is_propagated_unchanged() {
		let manager = manager_with(|| {
			let adapter = ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS);
			adapter.fail_connect(WalletError::connection_rejected(&WalletKind::MetaMask));
			adapter
		});

		let err = manager.connect(&WalletKind::MetaMask, None).await.unwrap_err();
		assert_eq!(err, WalletError::connection_rejected(&WalletKind::MetaMask));
		assert!(manager.connected_wallets().is_empty());
	}

	#[tokio::test]
	async fn test_routing_without_wallet_fails_not_connected() {
		let manager = manager_with(|| ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS));

		assert_eq!(
			manager.sign_message("hi").await.unwrap_err(),
			WalletError::no_wallet()
		);
		assert_eq!(
			manager
				.sign_message_with_chain_family("hi", Some(ChainFamily::Tron))
				.await
				.unwrap_err(),
			WalletError::family_not_connected(ChainFamily::Tron)
		);
		assert!(manager.provider().is_err());
	}

	#[tokio::test]
	async fn test_missing_capability_is_method_not_supported() {
		let manager = WalletManager::builder(WalletManagerConfig::default())
			.with_adapter_factory(WalletKind::TronLink, || {
				Arc::new(ScriptedAdapter::tron(WalletKind::TronLink, "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"))
			})
			.build();
		manager.connect(&WalletKind::TronLink, None).await.unwrap();

		let err = manager
			.sign_typed_data(&serde_json::json!({}), None)
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Method signTypedData is not supported by tronlink"
		);

		let err = manager
			.request_switch_chain(1, SwitchChainOptions::default())
			.await
			.unwrap_err();
		assert_eq!(err.code(), "METHOD_NOT_SUPPORTED");
	}

	#[tokio::test]
	async fn test_switch_chain_adds_chain_and_retries_once() {
		let manager = manager_with(|| {
			let adapter = ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS);
			adapter.fail_next_switches(1);
			adapter
		});
		manager.connect(&WalletKind::MetaMask, None).await.unwrap();

		let polygon = AddChainParams::from(manager.chains().get(137).unwrap());
		let account = manager
			.request_switch_chain(
				137,
				SwitchChainOptions {
					add_chain_if_missing: true,
					chain_config: Some(polygon),
				},
			)
			.await
			.unwrap();

		assert_eq!(account.chain_id, 137);
		assert_eq!(account.universal_address, format!("137:{}", EVM_ADDRESS));
	}

	#[tokio::test]
	async fn test_switch_chain_failure_without_opt_in_propagates() {
		let manager = manager_with(|| {
			let adapter = ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS);
			adapter.fail_next_switches(2);
			adapter
		});
		manager.connect(&WalletKind::MetaMask, None).await.unwrap();

		let err = manager
			.request_switch_chain(
				137,
				SwitchChainOptions {
					add_chain_if_missing: false,
					chain_config: None,
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, WalletError::Provider { code: Some(4902), .. }));

		let polygon = AddChainParams::from(manager.chains().get(137).unwrap());
		let result = manager
			.request_switch_chain(
				137,
				SwitchChainOptions {
					add_chain_if_missing: true,
					chain_config: Some(polygon),
				},
			)
			.await;
		assert!(result.is_ok());
		assert_eq!(manager.primary_account().unwrap().chain_id, 137);
	}

	#[tokio::test]
	async fn test_storage_disabled_skips_snapshots() {
		let backend = Arc::new(MemoryStorage::new());
		let storage = Arc::new(StorageService::new(Box::new(backend.clone())));
		let config = WalletManagerConfig {
			enable_storage: false,
			..Default::default()
		};
		let manager = WalletManager::builder(config)
			.with_adapter_factory(WalletKind::MetaMask, || {
				Arc::new(ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS))
			})
			.with_storage(storage.clone())
			.build();

		manager.connect(&WalletKind::MetaMask, None).await.unwrap();

		assert!(!storage.exists("enclave_wallet_data").await.unwrap());
		assert!(manager.restore_from_storage().await.is_none());
	}

	#[tokio::test]
	async fn test_contract_calls_route_to_primary() {
		let manager = manager_with(|| ScriptedAdapter::evm(WalletKind::MetaMask, EVM_ADDRESS));
		manager.connect(&WalletKind::MetaMask, None).await.unwrap();

		let params = ContractReadParams::new("0xToken", serde_json::json!([]), "balanceOf")
			.with_args(vec![serde_json::json!(EVM_ADDRESS)]);
		let value = manager.read_contract(&params, None).await.unwrap();
		assert_eq!(value["function"], "balanceOf");

		let write: ContractWriteParams = params.into();
		assert_eq!(manager.estimate_gas(&write, None).await.unwrap(), 21_000);
		let hash = manager.write_contract(&write, None).await.unwrap();
		let receipt = manager.wait_for_transaction(&hash, None, None).await.unwrap();
		assert!(receipt.is_success());
	}
}
