//! Shared behaviour of wallets that live in the host page.

use crate::base::AdapterCore;
use crate::host::HostEnvironment;
use crate::WalletAdapter;
use tracing::debug;
use wallet_types::{Account, WalletError, WalletResult, WalletState};

/// A wallet whose provider is injected by a browser extension.
///
/// Implementors supply the provider probe, the install link and the
/// attach/detach of host event listeners. Availability checks and the
/// disconnect sequence are provided.
pub trait InjectedWallet: WalletAdapter {
	fn host(&self) -> &dyn HostEnvironment;

	/// Whether the wallet's provider object is present in the host.
	fn provider_present(&self) -> bool;

	fn download_url(&self) -> &'static str;

	fn attach_listeners(&self);

	fn detach_listeners(&self);

	/// Has no side effects and may be called before any connection attempt.
	fn injected_available(&self) -> bool {
		self.host().has_dom() && self.provider_present()
	}

	fn ensure_available(&self) -> WalletResult<()> {
		if self.injected_available() {
			Ok(())
		} else {
			Err(WalletError::not_available(
				self.core().kind(),
				Some(self.download_url()),
			))
		}
	}

	/// Idempotent: detaches listeners, clears the session and always emits
	/// `Disconnected`.
	fn disconnect_injected(&self) {
		self.detach_listeners();
		self.core().disconnect();
	}
}

/// Applies a host "accounts changed" notification to an adapter session.
///
/// An empty list ends the session and emits `AccountChanged(None)` without a
/// separate `Disconnected`. Otherwise the first entry becomes the active
/// address on the previously known chain.
///
/// Switching to an account the origin never authorized produces no host
/// notification at all, so that case cannot be observed here.
pub fn apply_accounts_changed(
	core: &AdapterCore,
	accounts: &[String],
	normalize: impl Fn(&str) -> String,
) {
	match accounts.first() {
		None => {
			core.reset(WalletState::Disconnected);
			core.emit_account_changed();
		}
		Some(address) => {
			let Some(current) = core.account() else {
				debug!(wallet = %core.kind(), "Ignoring account change without an active session");
				return;
			};
			let next: Account = current.with_address(normalize(address));
			core.set_account(Some(next));
			core.emit_account_changed();
		}
	}
}

/// Applies a host "chain changed" notification carrying a hex chain id.
pub fn apply_chain_changed(core: &AdapterCore, chain_id_hex: &str) {
	match wallet_types::address::evm::parse_quantity(chain_id_hex)
		.and_then(|id| u64::try_from(id).ok())
	{
		Some(chain_id) => core.change_chain(chain_id),
		None => core.emit_error(WalletError::Provider {
			code: None,
			message: format!("Invalid chain id from provider: {}", chain_id_hex),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use std::sync::Arc;
	use wallet_types::{AdapterEvent, ChainFamily, WalletKind};

	fn recorded(core: &AdapterCore) -> Arc<Mutex<Vec<AdapterEvent>>> {
		let log = Arc::new(Mutex::new(Vec::new()));
		let l = log.clone();
		core.events().on_all(move |e| l.lock().push(e.clone()));
		log
	}

	fn connected_core() -> AdapterCore {
		let core = AdapterCore::new(WalletKind::MetaMask);
		core.set_connected(Account::new(137, "0xaaa", ChainFamily::Evm));
		core
	}

	#[test]
	fn test_empty_account_list_clears_without_disconnected_event() {
		let core = connected_core();
		let log = recorded(&core);

		apply_accounts_changed(&core, &[], str::to_string);

		assert_eq!(core.state(), WalletState::Disconnected);
		assert!(core.account().is_none());
		assert_eq!(*log.lock(), vec![AdapterEvent::AccountChanged(None)]);
	}

	#[test]
	fn test_new_account_keeps_chain() {
		let core = connected_core();
		let log = recorded(&core);

		apply_accounts_changed(&core, &["0xbbb".to_string(), "0xccc".to_string()], |a| {
			a.to_uppercase()
		});

		let account = core.account().unwrap();
		assert_eq!(account.chain_id, 137);
		assert_eq!(account.universal_address, "137:0XBBB");
		assert_eq!(*log.lock(), vec![AdapterEvent::AccountChanged(Some(account))]);
	}

	#[test]
	fn test_account_change_without_session_is_ignored() {
		let core = AdapterCore::new(WalletKind::MetaMask);
		let log = recorded(&core);

		apply_accounts_changed(&core, &["0xbbb".to_string()], str::to_string);

		assert!(core.account().is_none());
		assert!(log.lock().is_empty());
	}

	#[test]
	fn test_chain_changed_parses_hex() {
		let core = connected_core();
		let log = recorded(&core);

		apply_chain_changed(&core, "0x38");
		apply_chain_changed(&core, "bogus");

		assert_eq!(core.account().unwrap().chain_id, 56);
		let log = log.lock();
		assert_eq!(log[0], AdapterEvent::ChainChanged(56));
		assert!(matches!(log[1], AdapterEvent::Error(_)));
	}
}
