//! Shared session state and event plumbing for adapters.

use parking_lot::RwLock;
use std::sync::Arc;
use wallet_types::{
	Account, AdapterEvent, ChainId, EventEmitter, WalletError, WalletKind, WalletResult,
	WalletState,
};

#[derive(Debug, Default)]
struct Session {
	state: WalletState,
	account: Option<Account>,
}

struct CoreInner {
	kind: WalletKind,
	session: RwLock<Session>,
	events: EventEmitter<AdapterEvent>,
}

/// Connection state, current account and event dispatcher of one adapter.
///
/// Concrete adapters own an `AdapterCore` and change their observable state
/// only through it. The emitters read the account back from the session, so
/// an `AccountChanged` event always reports the account the adapter holds.
/// Clones share the same session, which lets background tasks and host
/// listeners update the adapter they belong to.
#[derive(Clone)]
pub struct AdapterCore {
	inner: Arc<CoreInner>,
}

impl AdapterCore {
	pub fn new(kind: WalletKind) -> Self {
		Self {
			inner: Arc::new(CoreInner {
				kind,
				session: RwLock::new(Session::default()),
				events: EventEmitter::new(),
			}),
		}
	}

	pub fn kind(&self) -> &WalletKind {
		&self.inner.kind
	}

	pub fn state(&self) -> WalletState {
		self.inner.session.read().state
	}

	pub fn account(&self) -> Option<Account> {
		self.inner.session.read().account.clone()
	}

	pub fn events(&self) -> &EventEmitter<AdapterEvent> {
		&self.inner.events
	}

	/// Returns the current account if the adapter is connected.
	///
	/// Both the state and the account are read under one lock: a session
	/// that is marked connected but has no account yet does not count.
	pub fn ensure_connected(&self) -> WalletResult<Account> {
		let session = self.inner.session.read();
		match (&session.state, &session.account) {
			(WalletState::Connected, Some(account)) => Ok(account.clone()),
			_ => Err(WalletError::not_connected(&self.inner.kind)),
		}
	}

	/// Native address of the current account.
	pub fn address(&self) -> WalletResult<String> {
		self.ensure_connected().map(|a| a.native_address)
	}

	pub fn set_state(&self, state: WalletState) {
		self.inner.session.write().state = state;
	}

	pub fn set_account(&self, account: Option<Account>) {
		self.inner.session.write().account = account;
	}

	/// Marks the session connected with `account` in one step.
	pub fn set_connected(&self, account: Account) {
		let mut session = self.inner.session.write();
		session.state = WalletState::Connected;
		session.account = Some(account);
	}

	/// Drops the account and records `state`.
	pub fn reset(&self, state: WalletState) {
		let mut session = self.inner.session.write();
		session.state = state;
		session.account = None;
	}

	/// Moves the current account to `chain_id`. Returns the updated account,
	/// or `None` when there is no account to move.
	pub fn move_to_chain(&self, chain_id: ChainId) -> Option<Account> {
		let mut session = self.inner.session.write();
		let moved = session.account.as_ref()?.with_chain(chain_id);
		session.account = Some(moved.clone());
		Some(moved)
	}

	/// Emits `AccountChanged` with the account currently held.
	pub fn emit_account_changed(&self) {
		let account = self.account();
		self.inner.events.emit(&AdapterEvent::AccountChanged(account));
	}

	pub fn emit_chain_changed(&self, chain_id: ChainId) {
		self.inner.events.emit(&AdapterEvent::ChainChanged(chain_id));
	}

	pub fn emit_disconnected(&self) {
		self.inner.events.emit(&AdapterEvent::Disconnected);
	}

	pub fn emit_error(&self, error: WalletError) {
		self.inner.events.emit(&AdapterEvent::Error(error));
	}

	/// Ends the session and announces it with `Disconnected`.
	pub fn disconnect(&self) {
		self.reset(WalletState::Disconnected);
		self.emit_disconnected();
	}

	/// Moves to `chain_id` and emits `ChainChanged` if an account exists.
	pub fn change_chain(&self, chain_id: ChainId) {
		if self.move_to_chain(chain_id).is_some() {
			self.emit_chain_changed(chain_id);
		}
	}
}

impl std::fmt::Debug for AdapterCore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let session = self.inner.session.read();
		f.debug_struct("AdapterCore")
			.field("kind", &self.inner.kind)
			.field("state", &session.state)
			.field("account", &session.account)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use wallet_types::{AdapterEventKind, ChainFamily};

	fn account() -> Account {
		Account::new(1, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", ChainFamily::Evm)
	}

	#[test]
	fn test_ensure_connected_requires_state_and_account() {
		let core = AdapterCore::new(WalletKind::MetaMask);
		assert!(matches!(
			core.ensure_connected(),
			Err(WalletError::NotConnected { .. })
		));

		core.set_state(WalletState::Connected);
		assert!(core.ensure_connected().is_err());

		core.set_state(WalletState::Connecting);
		core.set_account(Some(account()));
		assert!(core.ensure_connected().is_err());

		core.set_state(WalletState::Connected);
		assert_eq!(core.ensure_connected().unwrap(), account());
		assert_eq!(core.address().unwrap(), account().native_address);
	}

	#[test]
	fn test_account_changed_reports_held_account() {
		let core = AdapterCore::new(WalletKind::MetaMask);
		let seen = Arc::new(Mutex::new(Vec::new()));
		let s = seen.clone();
		core.events().on(AdapterEventKind::AccountChanged, move |e| {
			if let AdapterEvent::AccountChanged(a) = e {
				s.lock().push(a.clone());
			}
		});

		core.set_connected(account());
		core.emit_account_changed();
		core.reset(WalletState::Disconnected);
		core.emit_account_changed();

		assert_eq!(*seen.lock(), vec![Some(account()), None]);
	}

	#[test]
	fn test_change_chain_without_account_is_silent() {
		let core = AdapterCore::new(WalletKind::PrivateKey);
		let hits = Arc::new(Mutex::new(0));
		let h = hits.clone();
		core.events()
			.on(AdapterEventKind::ChainChanged, move |_| *h.lock() += 1);

		core.change_chain(137);
		assert_eq!(*hits.lock(), 0);

		core.set_connected(account());
		core.change_chain(137);
		assert_eq!(*hits.lock(), 1);
		assert_eq!(core.account().unwrap().universal_address.split(':').next(), Some("137"));
	}

	#[test]
	fn test_disconnect_clears_session_and_emits() {
		let core = AdapterCore::new(WalletKind::TronLink);
		let fired = Arc::new(Mutex::new(false));
		let f = fired.clone();
		core.events()
			.on(AdapterEventKind::Disconnected, move |_| *f.lock() = true);

		core.set_connected(account());
		core.disconnect();

		assert_eq!(core.state(), WalletState::Disconnected);
		assert!(core.account().is_none());
		assert!(*fired.lock());
	}
}
