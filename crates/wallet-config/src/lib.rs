//! Configuration loading for the wallet connector.
//!
//! Configuration is read from a TOML file. `${VAR}` references are replaced
//! with environment values before parsing, and a handful of prefixed
//! environment variables override the parsed values.

use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use wallet_storage::StorageBackend;
use wallet_types::address::evm::{is_hex, strip_hex_prefix};

pub mod types;

pub use types::{PrivateKeyConfig, WalletConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "WALLET_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads, overrides and validates the configuration.
	///
	/// Without a file the defaults are used.
	pub async fn load(&self) -> Result<WalletConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path).await?,
			None => {
				debug!("No configuration file given, using defaults");
				WalletConfig::default()
			}
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;
		Ok(config)
	}

	/// Parses configuration text, applying substitution, overrides and validation.
	pub fn load_str(&self, content: &str) -> Result<WalletConfig, ConfigError> {
		let mut config = self.parse(content)?;
		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;
		Ok(config)
	}

	async fn load_from_file(&self, path: &Path) -> Result<WalletConfig, ConfigError> {
		if !tokio::fs::try_exists(path).await? {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}
		info!(path = %path.display(), "Loading configuration");

		let content = tokio::fs::read_to_string(path).await?;
		self.parse(&content)
	}

	fn parse(&self, content: &str) -> Result<WalletConfig, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn env(&self, name: &str) -> Option<String> {
		env::var(format!("{}{}", self.env_prefix, name)).ok()
	}

	fn apply_env_overrides(&self, config: &mut WalletConfig) -> Result<(), ConfigError> {
		if let Some(path) = self.env("STORAGE_PATH") {
			debug!("Overriding storage path from environment");
			config.storage.path = PathBuf::from(path);
		}

		if let Some(chain_id) = self.env("DEFAULT_CHAIN_ID") {
			config.manager.default_chain_id = chain_id.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid default chain id: {}", e))
			})?;
		}

		if let Some(key) = self.env("PRIVATE_KEY") {
			debug!("Overriding private key from environment");
			config.private_key.key = Some(key);
		}

		Ok(())
	}
}

fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(full_match, &value);
	}

	Ok(result)
}

fn validate_config(config: &WalletConfig) -> Result<(), ConfigError> {
	if config.manager.storage_prefix.is_empty() {
		return Err(ConfigError::ValidationError(
			"Storage prefix must not be empty".to_string(),
		));
	}

	if config.storage.backend == StorageBackend::File
		&& config.storage.path.as_os_str().is_empty()
	{
		return Err(ConfigError::ValidationError(
			"File storage requires a path".to_string(),
		));
	}

	if let Some(key) = &config.private_key.key {
		let digits = strip_hex_prefix(key.trim());
		if digits.len() != 64 || !is_hex(&format!("0x{}", digits)) {
			return Err(ConfigError::ValidationError(
				"Private key must be 32 bytes of hex".to_string(),
			));
		}
	}

	let chain_ids = [
		("manager.default_chain_id", Some(config.manager.default_chain_id)),
		(
			"manager.default_tron_chain_id",
			Some(config.manager.default_tron_chain_id),
		),
		("private_key.chain_id", config.private_key.chain_id),
	];
	for (field, chain_id) in chain_ids {
		if chain_id == Some(0) {
			return Err(ConfigError::ValidationError(format!(
				"{} must be greater than zero",
				field
			)));
		}
	}

	for chain in &config.chains {
		if chain.id == 0 {
			return Err(ConfigError::ValidationError(format!(
				"Chain '{}' has id zero",
				chain.name
			)));
		}
		if chain.rpc_urls.is_empty() {
			return Err(ConfigError::ValidationError(format!(
				"Chain {} has no RPC URL",
				chain.id
			)));
		}
	}

	Ok(())
}
