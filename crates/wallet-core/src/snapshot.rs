//! The persisted connection snapshot.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use wallet_storage::{StorageError, StorageService};
use wallet_types::{ChainFamily, ChainId, UniversalAddress, WalletKind};

/// One pooled wallet at the time of the last save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
	pub universal_address: UniversalAddress,
	pub native_address: String,
	pub chain_id: ChainId,
	pub chain_family: ChainFamily,
	pub wallet_kind: WalletKind,
	/// Unix time in milliseconds.
	pub last_connected_at: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Stored form of the manager's state.
///
/// `history` is rebuilt from the pool on every save rather than appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
	/// Universal address of the primary wallet.
	#[serde(default)]
	pub current: Option<UniversalAddress>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub primary_wallet_kind: Option<WalletKind>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub primary_chain_id: Option<ChainId>,
	#[serde(default)]
	pub history: Vec<HistoryRecord>,
}

/// Reads and writes the snapshot under one storage key.
///
/// Writes are serialized so the last save to start is the last to land.
pub struct SnapshotStore {
	storage: Arc<StorageService>,
	key: String,
	write_lock: Mutex<()>,
}

impl SnapshotStore {
	pub fn new(storage: Arc<StorageService>, key: impl Into<String>) -> Self {
		Self {
			storage,
			key: key.into(),
			write_lock: Mutex::new(()),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Loads the snapshot. A missing, unreadable or differently shaped
	/// value is reported as `None`.
	pub async fn load(&self) -> Option<StorageData> {
		match self.storage.retrieve::<StorageData>(&self.key).await {
			Ok(data) => Some(data),
			Err(StorageError::NotFound) => {
				debug!(key = %self.key, "No stored wallet data found");
				None
			}
			Err(e) => {
				warn!(key = %self.key, error = %e, "Ignoring unreadable wallet snapshot");
				None
			}
		}
	}

	/// Builds the snapshot with `build` once earlier writes have finished,
	/// then stores it.
	pub async fn save_with<F>(&self, build: F) -> Result<(), StorageError>
	where
		F: FnOnce() -> StorageData,
	{
		let _guard = self.write_lock.lock().await;
		let data = build();
		self.storage.store(&self.key, &data).await
	}

	pub async fn clear(&self) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		self.storage.remove(&self.key).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wallet_storage::MemoryStorage;

	fn store() -> (Arc<MemoryStorage>, SnapshotStore) {
		let backend = Arc::new(MemoryStorage::new());
		let service = StorageService::new(Box::new(backend.clone()));
		(backend, SnapshotStore::new(Arc::new(service), "enclave_wallet_data"))
	}

	#[test]
	fn test_schema_field_names() {
		let data = StorageData {
			current: Some("1:0xabc".to_string()),
			primary_wallet_kind: Some(WalletKind::MetaMask),
			primary_chain_id: Some(1),
			history: vec![HistoryRecord {
				universal_address: "1:0xabc".to_string(),
				native_address: "0xabc".to_string(),
				chain_id: 1,
				chain_family: ChainFamily::Evm,
				wallet_kind: WalletKind::MetaMask,
				last_connected_at: 1_700_000_000_000,
				name: None,
			}],
		};

		let value = serde_json::to_value(&data).unwrap();
		assert_eq!(value["primaryWalletKind"], "metamask");
		assert_eq!(value["primaryChainId"], 1);
		assert_eq!(value["history"][0]["chainFamily"], "evm");
		assert_eq!(value["history"][0]["lastConnectedAt"], 1_700_000_000_000i64);
		assert!(value["history"][0].get("name").is_none());

		let empty = serde_json::to_value(StorageData::default()).unwrap();
		assert!(empty["current"].is_null());
	}

	#[tokio::test]
	async fn test_save_load_clear() {
		let (_, snapshots) = store();
		assert!(snapshots.load().await.is_none());

		snapshots
			.save_with(|| StorageData {
				current: Some("195:TAddr".to_string()),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(
			snapshots.load().await.unwrap().current.as_deref(),
			Some("195:TAddr")
		);

		snapshots.clear().await.unwrap();
		assert!(snapshots.load().await.is_none());
	}

	#[tokio::test]
	async fn test_incompatible_snapshot_is_treated_as_absent() {
		let (backend, snapshots) = store();
		use wallet_storage::StorageInterface;
		backend
			.set_bytes("enclave_wallet_data", b"{\"current\": 42}".to_vec())
			.await
			.unwrap();

		assert!(snapshots.load().await.is_none());
	}
}
