//! Adapter registry mapping wallet kinds to adapter factories.

use std::collections::HashMap;
use std::sync::Arc;
use wallet_adapters::{
	HostEnvironment, MetaMaskAdapter, PrivateKeyAdapter, TronLinkAdapter, WalletAdapter,
};
use wallet_types::{ChainFamily, ChainRegistry, WalletKind};

/// Produces a fresh, unconnected adapter.
pub type AdapterFactory = Box<dyn Fn() -> Arc<dyn WalletAdapter> + Send + Sync>;

/// Registry of the wallet kinds the manager can connect.
pub struct AdapterRegistry {
	factories: HashMap<WalletKind, AdapterFactory>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self {
			factories: HashMap::new(),
		}
	}

	/// Registers the built-in MetaMask, private key and TronLink adapters.
	pub fn with_defaults(host: Arc<dyn HostEnvironment>, chains: ChainRegistry) -> Self {
		let mut registry = Self::new();

		let metamask_host = host.clone();
		let metamask_chains = chains.clone();
		registry.register(WalletKind::MetaMask, move || {
			Arc::new(
				MetaMaskAdapter::new(metamask_host.clone()).with_chains(metamask_chains.clone()),
			)
		});

		let private_key_chains = chains;
		registry.register(WalletKind::PrivateKey, move || {
			Arc::new(PrivateKeyAdapter::new().with_chains(private_key_chains.clone()))
		});

		registry.register(WalletKind::TronLink, move || {
			Arc::new(TronLinkAdapter::new(host.clone()))
		});

		registry
	}

	/// Registers a factory. A later registration for the same kind wins.
	pub fn register<F>(&mut self, kind: WalletKind, factory: F)
	where
		F: Fn() -> Arc<dyn WalletAdapter> + Send + Sync + 'static,
	{
		self.factories.insert(kind, Box::new(factory));
	}

	/// Creates a new adapter instance for `kind`.
	pub fn get_adapter(&self, kind: &WalletKind) -> Option<Arc<dyn WalletAdapter>> {
		self.factories.get(kind).map(|factory| factory())
	}

	pub fn has(&self, kind: &WalletKind) -> bool {
		self.factories.contains_key(kind)
	}

	/// Registered kinds, sorted by name.
	pub fn registered_kinds(&self) -> Vec<WalletKind> {
		let mut kinds: Vec<WalletKind> = self.factories.keys().cloned().collect();
		kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
		kinds
	}

	/// Kinds whose adapters belong to `family`.
	///
	/// Instantiates one throwaway adapter per registered kind.
	pub fn kinds_for_chain_family(&self, family: ChainFamily) -> Vec<WalletKind> {
		let mut kinds: Vec<WalletKind> = self
			.factories
			.iter()
			.filter(|(_, factory)| factory().chain_family() == family)
			.map(|(kind, _)| kind.clone())
			.collect();
		kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
		kinds
	}
}

impl Default for AdapterRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use wallet_adapters::testing::ScriptedAdapter;
	use wallet_adapters::DetachedHost;

	#[test]
	fn test_get_adapter_returns_fresh_instances() {
		let built = Arc::new(AtomicUsize::new(0));
		let counter = built.clone();

		let mut registry = AdapterRegistry::new();
		registry.register(WalletKind::MetaMask, move || {
			counter.fetch_add(1, Ordering::SeqCst);
			Arc::new(ScriptedAdapter::evm(WalletKind::MetaMask, "0xabc"))
		});

		let first = registry.get_adapter(&WalletKind::MetaMask).unwrap();
		let second = registry.get_adapter(&WalletKind::MetaMask).unwrap();

		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(built.load(Ordering::SeqCst), 2);
		assert!(registry.get_adapter(&WalletKind::TronLink).is_none());
	}

	#[test]
	fn test_last_registration_wins() {
		let mut registry = AdapterRegistry::new();
		registry.register(WalletKind::from("rabby"), || {
			Arc::new(ScriptedAdapter::evm(WalletKind::from("rabby"), "0x1"))
		});
		registry.register(WalletKind::from("rabby"), || {
			Arc::new(ScriptedAdapter::tron(WalletKind::from("rabby"), "TAddr"))
		});

		let adapter = registry.get_adapter(&WalletKind::from("rabby")).unwrap();
		assert_eq!(adapter.chain_family(), ChainFamily::Tron);
		assert_eq!(registry.registered_kinds().len(), 1);
	}

	#[test]
	fn test_defaults_grouped_by_family() {
		let registry = AdapterRegistry::with_defaults(Arc::new(DetachedHost), ChainRegistry::new());

		assert!(registry.has(&WalletKind::PrivateKey));
		assert!(!registry.has(&WalletKind::WalletConnect));
		assert_eq!(
			registry.kinds_for_chain_family(ChainFamily::Evm),
			vec![WalletKind::MetaMask, WalletKind::PrivateKey]
		);
		assert_eq!(
			registry.kinds_for_chain_family(ChainFamily::Tron),
			vec![WalletKind::TronLink]
		);
	}
}
