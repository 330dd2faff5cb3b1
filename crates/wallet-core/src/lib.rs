//! Core of the multi-chain wallet connector.
//!
//! The [`WalletManager`] keeps one connected adapter per chain family, tracks
//! which of them is primary and persists the connection snapshot. Adapters
//! are created on demand from an [`AdapterRegistry`].

pub mod auth;
pub mod config;
pub mod detection;
pub mod event_bus;
pub mod manager;
pub mod registry;
pub mod snapshot;

pub use auth::{generate_nonce, AuthMessageGenerator, SignatureVerifier};
pub use config::WalletManagerConfig;
pub use detection::{
	wallet_metadata, WalletAvailability, WalletDetector, WalletMetadata, SUPPORTED_WALLETS,
};
pub use event_bus::EventBus;
pub use manager::{ConnectedWallet, SwitchChainOptions, WalletManager, WalletManagerBuilder};
pub use registry::{AdapterFactory, AdapterRegistry};
pub use snapshot::{HistoryRecord, SnapshotStore, StorageData};
