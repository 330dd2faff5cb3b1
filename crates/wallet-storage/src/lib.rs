//! Storage module for the wallet connector.
//!
//! This module provides the key-value blob store the wallet manager persists
//! its connection snapshot into, with file-based and in-memory backends.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileStorage;
pub use implementations::memory::MemoryStorage;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends only deal in opaque bytes under string keys; the typed layer
/// lives in [`StorageService`].
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key. Deleting a missing
	/// key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Shared backends, so a caller can keep a handle to the store it hands over.
#[async_trait]
impl<T: StorageInterface + ?Sized> StorageInterface for Arc<T> {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		(**self).get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		(**self).set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		(**self).delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		(**self).exists(key).await
	}
}

/// High-level storage service that provides typed operations.
///
/// Values are stored as JSON.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Serializes `data` to JSON and stores it under `key`.
	pub async fn store<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(key, bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	///
	/// Fails with [`StorageError::NotFound`] for a missing key and
	/// [`StorageError::Serialization`] for a value of a different shape.
	pub async fn retrieve<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.backend.delete(key).await
	}

	pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.backend.exists(key).await
	}
}

/// Which backend to persist into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	File,
	Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
	#[serde(default)]
	pub backend: StorageBackend,
	/// Base directory for the file backend.
	#[serde(default = "default_storage_path")]
	pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
	PathBuf::from("./data/wallet")
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: StorageBackend::default(),
			path: default_storage_path(),
		}
	}
}

/// Factory function to create a storage backend from configuration.
pub fn create_storage(config: &StorageConfig) -> Box<dyn StorageInterface> {
	match config.backend {
		StorageBackend::File => Box::new(FileStorage::new(config.path.clone())),
		StorageBackend::Memory => Box::new(MemoryStorage::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Record {
		name: String,
		count: u32,
	}

	#[tokio::test]
	async fn test_store_retrieve_remove() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let record = Record {
			name: "primary".to_string(),
			count: 2,
		};

		service.store("wallet_data", &record).await.unwrap();
		assert!(service.exists("wallet_data").await.unwrap());

		let loaded: Record = service.retrieve("wallet_data").await.unwrap();
		assert_eq!(loaded, record);

		service.remove("wallet_data").await.unwrap();
		let missing = service.retrieve::<Record>("wallet_data").await;
		assert!(matches!(missing, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_retrieve_with_wrong_shape_is_serialization_error() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("wallet_data", b"{\"unexpected\":true}".to_vec())
			.await
			.unwrap();
		let service = StorageService::new(Box::new(backend));

		let result = service.retrieve::<Record>("wallet_data").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}

	#[test]
	fn test_storage_config_defaults() {
		let config: StorageConfig = serde_json::from_str("{\"backend\":\"memory\"}").unwrap();
		assert_eq!(config.backend, StorageBackend::Memory);
		assert_eq!(config.path, PathBuf::from("./data/wallet"));
	}
}
