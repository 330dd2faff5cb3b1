//! Event definitions and the synchronous listener registry.
//!
//! Adapters and the wallet manager each own an [`EventEmitter`]. Emitting an
//! event invokes every listener registered for that event's kind, in
//! registration order, on the caller's stack. A panicking listener is not
//! caught and unwinds out of `emit`.

use crate::account::{Account, ChainFamily, ChainId};
use crate::errors::WalletError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Implemented by event enums so listeners can filter on a fieldless kind.
pub trait EventKind {
	type Kind: Copy + Eq + std::fmt::Debug + Send + Sync + 'static;

	fn kind(&self) -> Self::Kind;
}

/// Events published by a single wallet adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
	AccountChanged(Option<Account>),
	ChainChanged(ChainId),
	Disconnected,
	Error(WalletError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterEventKind {
	AccountChanged,
	ChainChanged,
	Disconnected,
	Error,
}

impl EventKind for AdapterEvent {
	type Kind = AdapterEventKind;

	fn kind(&self) -> AdapterEventKind {
		match self {
			Self::AccountChanged(_) => AdapterEventKind::AccountChanged,
			Self::ChainChanged(_) => AdapterEventKind::ChainChanged,
			Self::Disconnected => AdapterEventKind::Disconnected,
			Self::Error(_) => AdapterEventKind::Error,
		}
	}
}

/// Events published by the wallet manager.
///
/// The unprefixed variants only concern the primary wallet; the `Wallet*`
/// variants are raised for every pooled wallet and carry an `is_primary` flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
	AccountChanged(Option<Account>),
	ChainChanged {
		chain_id: ChainId,
		account: Account,
	},
	Disconnected,
	WalletAccountChanged {
		family: ChainFamily,
		account: Option<Account>,
		is_primary: bool,
	},
	WalletChainChanged {
		family: ChainFamily,
		chain_id: ChainId,
		account: Account,
		is_primary: bool,
	},
	WalletDisconnected {
		family: ChainFamily,
		is_primary: bool,
	},
	PrimaryWalletSwitched {
		new_primary: Account,
		old_primary: Option<Account>,
		family: ChainFamily,
	},
	Error(WalletError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerEventKind {
	AccountChanged,
	ChainChanged,
	Disconnected,
	WalletAccountChanged,
	WalletChainChanged,
	WalletDisconnected,
	PrimaryWalletSwitched,
	Error,
}

impl EventKind for ManagerEvent {
	type Kind = ManagerEventKind;

	fn kind(&self) -> ManagerEventKind {
		match self {
			Self::AccountChanged(_) => ManagerEventKind::AccountChanged,
			Self::ChainChanged { .. } => ManagerEventKind::ChainChanged,
			Self::Disconnected => ManagerEventKind::Disconnected,
			Self::WalletAccountChanged { .. } => ManagerEventKind::WalletAccountChanged,
			Self::WalletChainChanged { .. } => ManagerEventKind::WalletChainChanged,
			Self::WalletDisconnected { .. } => ManagerEventKind::WalletDisconnected,
			Self::PrimaryWalletSwitched { .. } => ManagerEventKind::PrimaryWalletSwitched,
			Self::Error(_) => ManagerEventKind::Error,
		}
	}
}

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registration<E: EventKind> {
	id: ListenerId,
	/// `None` subscribes to every kind.
	kind: Option<E::Kind>,
	listener: Listener<E>,
}

/// In-process, synchronous event dispatcher.
pub struct EventEmitter<E: EventKind> {
	next_id: AtomicU64,
	listeners: Mutex<Vec<Registration<E>>>,
}

impl<E: EventKind> EventEmitter<E> {
	pub fn new() -> Self {
		Self {
			next_id: AtomicU64::new(1),
			listeners: Mutex::new(Vec::new()),
		}
	}

	/// Registers a listener for one event kind.
	pub fn on<F>(&self, kind: E::Kind, listener: F) -> ListenerId
	where
		F: Fn(&E) + Send + Sync + 'static,
	{
		self.register(Some(kind), Arc::new(listener))
	}

	/// Registers a listener for every event kind.
	pub fn on_all<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&E) + Send + Sync + 'static,
	{
		self.register(None, Arc::new(listener))
	}

	fn register(&self, kind: Option<E::Kind>, listener: Listener<E>) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.lock().push(Registration { id, kind, listener });
		id
	}

	/// Removes a listener. Returns false if it was not registered.
	pub fn off(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.len();
		listeners.retain(|r| r.id != id);
		listeners.len() != before
	}

	/// Removes every listener for `kind`, or every listener when `kind` is `None`.
	///
	/// Listeners registered through [`EventEmitter::on_all`] are only removed
	/// by the `None` form.
	pub fn remove_all_listeners(&self, kind: Option<E::Kind>) {
		let mut listeners = self.listeners.lock();
		match kind {
			Some(kind) => listeners.retain(|r| r.kind != Some(kind)),
			None => listeners.clear(),
		}
	}

	pub fn listener_count(&self, kind: E::Kind) -> usize {
		self.listeners
			.lock()
			.iter()
			.filter(|r| r.kind.map_or(true, |k| k == kind))
			.count()
	}

	/// Delivers `event` to the matching listeners. Returns whether any listener ran.
	///
	/// The registry lock is released before listeners run, so a listener may
	/// subscribe or unsubscribe without deadlocking; such changes take effect
	/// from the next emission.
	pub fn emit(&self, event: &E) -> bool {
		let kind = event.kind();
		let targets: Vec<Listener<E>> = self
			.listeners
			.lock()
			.iter()
			.filter(|r| r.kind.map_or(true, |k| k == kind))
			.map(|r| r.listener.clone())
			.collect();

		for listener in &targets {
			listener(event);
		}
		!targets.is_empty()
	}
}

impl<E: EventKind> Default for EventEmitter<E> {
	fn default() -> Self {
		Self::new()
	}
}
