//! TronLink adapter over the injected TronWeb object.

use crate::base::AdapterCore;
use crate::capabilities::{Capabilities, Capability};
use crate::host::{
	HostEnvironment, HostEvent, HostEventSource, HostSubscription, ProviderRpcError,
	TronWebProvider,
};
use crate::injected::{apply_accounts_changed, InjectedWallet};
use crate::{ProviderHandle, WalletAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wallet_types::{
	Account, ChainFamily, ChainId, SignatureTarget, Transaction, WalletError, WalletKind,
	WalletResult, WalletState,
};

pub const TRONLINK_DOWNLOAD_URL: &str = "https://www.tronlink.org/";
pub const TRONLINK_ICON: &str = "https://www.tronlink.org/static/logoIcon.svg";
pub const TRON_MAINNET_CHAIN_ID: ChainId = 195;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How account changes reach the adapter.
enum Watch {
	Events(Arc<dyn HostEventSource>, HostSubscription),
	Polling(CancellationToken),
}

fn release(slot: &Mutex<Option<Watch>>) {
	let watch = slot.lock().take();
	match watch {
		Some(Watch::Events(source, subscription)) => source.unsubscribe(subscription),
		Some(Watch::Polling(token)) => token.cancel(),
		None => {}
	}
}

/// Adapter for the TronLink browser extension.
pub struct TronLinkAdapter {
	core: AdapterCore,
	host: Arc<dyn HostEnvironment>,
	watch: Arc<Mutex<Option<Watch>>>,
	poll_interval: Duration,
}

impl TronLinkAdapter {
	pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
		Self {
			core: AdapterCore::new(WalletKind::TronLink),
			host,
			watch: Arc::new(Mutex::new(None)),
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	/// Interval of the account polling used when TronLink exposes no event channel.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	/// Whether account polling is running.
	pub fn is_polling(&self) -> bool {
		matches!(&*self.watch.lock(), Some(Watch::Polling(token)) if !token.is_cancelled())
	}

	fn tron_web(&self) -> WalletResult<Arc<dyn TronWebProvider>> {
		self.host
			.tron_web()
			.ok_or_else(|| WalletError::not_available(self.core.kind(), Some(TRONLINK_DOWNLOAD_URL)))
	}

	async fn open_session(&self, chain_id: Option<ChainId>) -> WalletResult<Account> {
		let tron_web = self.tron_web()?;

		let response = tron_web
			.request("tron_requestAccounts", json!({}))
			.await
			.map_err(|e| {
				if e.is_user_rejection() || e.message.contains("User rejected") {
					WalletError::connection_rejected(self.core.kind())
				} else {
					e.into()
				}
			})?;
		if response.get("code").and_then(Value::as_i64) != Some(200) {
			debug!(?response, "tron_requestAccounts was not accepted");
			return Err(WalletError::connection_rejected(self.core.kind()));
		}

		let address = tron_web.default_address().ok_or_else(|| WalletError::Provider {
			code: None,
			message: "Failed to get Tron address".to_string(),
		})?;

		Ok(Account::new(
			chain_id.unwrap_or(TRON_MAINNET_CHAIN_ID),
			address,
			ChainFamily::Tron,
		))
	}

	fn start_polling(&self) -> Option<CancellationToken> {
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			warn!("No async runtime; TronLink account changes will not be observed");
			return None;
		};

		let token = CancellationToken::new();
		let cancelled = token.clone();
		let core = self.core.clone();
		let host = self.host.clone();
		let interval = self.poll_interval;
		let mut last_known = core.account().map(|a| a.native_address);

		handle.spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await;
			loop {
				tokio::select! {
					_ = cancelled.cancelled() => break,
					_ = ticker.tick() => {}
				}

				let current = host.tron_web().and_then(|t| t.default_address());
				match current {
					Some(address) if last_known.as_deref() != Some(address.as_str()) => {
						debug!(%address, "TronLink account changed");
						last_known = Some(address.clone());
						apply_accounts_changed(&core, &[address], str::to_string);
					}
					None if last_known.is_some() => {
						debug!("TronLink account no longer available");
						last_known = None;
						apply_accounts_changed(&core, &[], str::to_string);
					}
					_ => {}
				}
			}
			debug!("TronLink account polling stopped");
		});

		Some(token)
	}

	fn sign_error(e: ProviderRpcError, target: SignatureTarget) -> WalletError {
		if e.message.contains("User rejected") || e.message.contains("Confirmation declined") {
			return WalletError::signature_rejected(target);
		}
		if e.message.contains("Invalid transaction") {
			let message = match target {
				SignatureTarget::Message => {
					"Invalid message format. For transaction signing, use signTransaction() instead."
				}
				SignatureTarget::Transaction => {
					"Invalid transaction format. Please provide a properly formatted Tron transaction object."
				}
			};
			return WalletError::Provider {
				code: Some(e.code),
				message: message.to_string(),
			};
		}
		e.into()
	}
}

#[async_trait]
impl WalletAdapter for TronLinkAdapter {
	fn core(&self) -> &AdapterCore {
		&self.core
	}

	fn chain_family(&self) -> ChainFamily {
		ChainFamily::Tron
	}

	fn name(&self) -> &str {
		"TronLink"
	}

	fn icon(&self) -> Option<&str> {
		Some(TRONLINK_ICON)
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities::empty().with(Capability::SignTransaction)
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
				self.detach_listeners();
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
		let tron_web = self.host.tron_web()?;
		Some(tron_web.default_address().into_iter().collect())
	}

	fn provider(&self) -> ProviderHandle {
		match self.host.tron_web() {
			Some(tron_web) => ProviderHandle::TronWeb(tron_web),
			None => ProviderHandle::Unavailable,
		}
	}

	async fn sign_message(&self, message: &str) -> WalletResult<String> {
		self.core.ensure_connected()?;
		let tron_web = self.tron_web()?;

		let result = if tron_web.supports_sign_message_v2() {
			tron_web.sign_message_v2(message).await
		} else {
			warn!("signMessageV2 not available, falling back to sign()");
			tron_web
				.sign(Value::String(message.to_string()))
				.await
				.map(signature_string)
		};
		result.map_err(|e| Self::sign_error(e, SignatureTarget::Message))
	}

	async fn sign_transaction(&self, transaction: &Transaction) -> WalletResult<String> {
		self.core.ensure_connected()?;
		let Transaction::Tron(tx) = transaction else {
			return Err(WalletError::Configuration(
				"TronLink can only sign Tron transactions".to_string(),
			));
		};

		let tron_web = self.tron_web()?;
		let signed = tron_web
			.sign(serde_json::to_value(tx)?)
			.await
			.map_err(|e| Self::sign_error(e, SignatureTarget::Transaction))?;
		Ok(signature_string(signed))
	}
}

/// TronWeb answers with either a bare signature or the signed transaction object.
fn signature_string(value: Value) -> String {
	match value {
		Value::String(s) => s,
		other => other.to_string(),
	}
}

impl InjectedWallet for TronLinkAdapter {
	fn host(&self) -> &dyn HostEnvironment {
		self.host.as_ref()
	}

	fn provider_present(&self) -> bool {
		self.host.tron_web().is_some()
	}

	fn download_url(&self) -> &'static str {
		TRONLINK_DOWNLOAD_URL
	}

	fn attach_listeners(&self) {
		self.detach_listeners();

		let watch = match self.host.tron_link_events() {
			Some(source) => {
				let core = self.core.clone();
				let slot = Arc::downgrade(&self.watch);
				let subscription = source.subscribe(Arc::new(move |event: &HostEvent| match event {
					HostEvent::AccountsChanged(accounts) => {
						apply_accounts_changed(&core, accounts, str::to_string)
					}
					HostEvent::Disconnect => {
						if let Some(slot) = slot.upgrade() {
							release(&slot);
						}
						core.disconnect();
					}
					HostEvent::ChainChanged(_) => {}
				}));
				Some(Watch::Events(source, subscription))
			}
			None => self.start_polling().map(Watch::Polling),
		};
		*self.watch.lock() = watch;
	}

	fn detach_listeners(&self) {
		release(&self.watch);
	}
}

impl Drop for TronLinkAdapter {
	fn drop(&mut self) {
		self.detach_listeners();
	}
}
