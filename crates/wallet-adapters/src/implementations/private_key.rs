//! EVM adapter backed by a raw private key.
//!
//! Intended for development and scripted use. The key is held in memory
//! only and is dropped on disconnect.

use crate::abi::{decode_output, encode_call, resolve_function};
use crate::base::AdapterCore;
use crate::capabilities::{Capabilities, Capability};
use crate::receipt::confirmations;
use crate::{ProviderHandle, WalletAdapter};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::dyn_abi::TypedData;
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::json_abi::Function;
use alloy::network::{EthereumWallet, TransactionBuilder, TxSigner};
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt as RpcReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use wallet_types::address::evm::{ensure_hex_prefix, parse_quantity};
use wallet_types::{
	Account, ChainFamily, ChainId, ChainRegistry, ContractReadParams, ContractWriteParams,
	EvmTransaction, ReceiptStatus, Transaction, TransactionReceipt, WalletError, WalletKind,
	WalletResult, WalletState,
};

pub const DEFAULT_CHAIN_ID: ChainId = 1;

const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct LocalSession {
	signer: PrivateKeySigner,
	/// `None` when chain metadata has no RPC endpoint for the chain.
	provider: Option<DynProvider>,
}

/// Signs locally with a private key and talks to chains over HTTP RPC.
pub struct PrivateKeyAdapter {
	core: AdapterCore,
	chains: ChainRegistry,
	key: Mutex<Option<String>>,
	session: RwLock<Option<LocalSession>>,
	receipt_poll_interval: Duration,
}

impl PrivateKeyAdapter {
	pub fn new() -> Self {
		Self {
			core: AdapterCore::new(WalletKind::PrivateKey),
			chains: ChainRegistry::new(),
			key: Mutex::new(None),
			session: RwLock::new(None),
			receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
		}
	}

	/// Chain metadata providing RPC endpoints.
	pub fn with_chains(mut self, chains: ChainRegistry) -> Self {
		self.chains = chains;
		self
	}

	pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
		self.receipt_poll_interval = interval;
		self
	}

	/// Stores the key to use on the next connect. A missing `0x` prefix is added.
	pub fn set_private_key(&self, key: &str) {
		*self.key.lock() = Some(ensure_hex_prefix(key.trim()));
	}

	fn build_provider(
		&self,
		signer: &PrivateKeySigner,
		chain_id: ChainId,
	) -> WalletResult<Option<DynProvider>> {
		let Some(rpc_url) = self.chains.get(chain_id).and_then(|c| c.rpc_url()) else {
			debug!(chain_id, "No RPC endpoint known, contract calls are unavailable");
			return Ok(None);
		};

		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer.clone()))
			.connect_http(rpc_url.parse().map_err(|e| {
				WalletError::Configuration(format!("Invalid RPC URL: {}", e))
			})?);
		Ok(Some(DynProvider::new(provider)))
	}

	fn local_signer(&self) -> WalletResult<PrivateKeySigner> {
		self.core.ensure_connected()?;
		self.session
			.read()
			.as_ref()
			.map(|s| s.signer.clone())
			.ok_or_else(|| WalletError::not_connected(self.core.kind()))
	}

	fn rpc(&self) -> WalletResult<(Account, DynProvider)> {
		let account = self.core.ensure_connected()?;
		let provider = self
			.session
			.read()
			.as_ref()
			.and_then(|s| s.provider.clone())
			.ok_or_else(|| WalletError::chain_not_supported(account.chain_id, self.core.kind()))?;
		Ok((account, provider))
	}

	fn contract_request(
		from: Address,
		call: &ContractReadParams,
	) -> WalletResult<(Function, TransactionRequest)> {
		let function = resolve_function(&call.abi, &call.function_name, call.args.len())?;
		let data = encode_call(&function, &call.args)?;
		let request = TransactionRequest::default()
			.with_from(from)
			.with_to(parse_address(&call.address)?)
			.with_input(Bytes::from(data));
		Ok((function, request))
	}

	fn write_request(from: Address, params: &ContractWriteParams) -> WalletResult<TransactionRequest> {
		let (_, mut request) = Self::contract_request(from, &params.call)?;
		if let Some(value) = &params.value {
			request = request.with_value(parse_u256(value)?);
		}
		if let Some(gas) = params.gas {
			request = request.with_gas_limit(gas);
		}
		if let Some(gas_price) = &params.gas_price {
			request = request.with_gas_price(parse_u128(gas_price)?);
		}
		Ok(request)
	}

	async fn sign_evm_transaction(
		&self,
		signer: &PrivateKeySigner,
		tx: &EvmTransaction,
		chain_id: ChainId,
	) -> WalletResult<String> {
		let to = TxKind::Call(parse_address(&tx.to)?);
		let value = tx.value.as_deref().map(parse_u256).transpose()?.unwrap_or_default();
		let input = match tx.data.as_deref() {
			Some(data) => Bytes::from(
				hex::decode(data).map_err(|e| WalletError::Serialization(e.to_string()))?,
			),
			None => Bytes::new(),
		};
		let gas_limit = tx
			.gas
			.as_deref()
			.map(parse_u128)
			.transpose()?
			.map(|g| u64::try_from(g).unwrap_or(u64::MAX))
			.unwrap_or(21_000);
		let nonce = tx.nonce.unwrap_or_default();
		let fee = |field: &Option<String>| -> WalletResult<u128> {
			field.as_deref().map(parse_u128).transpose().map(Option::unwrap_or_default)
		};

		let envelope: TxEnvelope = if tx.is_eip1559() {
			let mut unsigned = TxEip1559 {
				chain_id,
				nonce,
				gas_limit,
				max_fee_per_gas: fee(&tx.max_fee_per_gas)?,
				max_priority_fee_per_gas: fee(&tx.max_priority_fee_per_gas)?,
				to,
				value,
				input,
				..Default::default()
			};
			let signature = signer
				.sign_transaction(&mut unsigned)
				.await
				.map_err(signing_error)?;
			unsigned.into_signed(signature).into()
		} else {
			let mut unsigned = TxLegacy {
				chain_id: Some(chain_id),
				nonce,
				gas_price: fee(&tx.gas_price)?,
				gas_limit,
				to,
				value,
				input,
			};
			let signature = signer
				.sign_transaction(&mut unsigned)
				.await
				.map_err(signing_error)?;
			unsigned.into_signed(signature).into()
		};

		Ok(hex::encode_prefixed(envelope.encoded_2718()))
	}
}

impl Default for PrivateKeyAdapter {
	fn default() -> Self {
		Self::new()
	}
}

fn signing_error(e: impl std::fmt::Display) -> WalletError {
	WalletError::Provider {
		code: None,
		message: format!("Signing failed: {}", e),
	}
}

fn rpc_error(call: &str, e: impl std::fmt::Display) -> WalletError {
	WalletError::Network(format!("{} failed: {}", call, e))
}

fn parse_address(address: &str) -> WalletResult<Address> {
	address
		.parse()
		.map_err(|_| WalletError::InvalidAddress(address.to_string()))
}

fn parse_u256(value: &str) -> WalletResult<U256> {
	value
		.parse()
		.map_err(|e| WalletError::Serialization(format!("Invalid amount {}: {}", value, e)))
}

fn parse_u128(value: &str) -> WalletResult<u128> {
	parse_quantity(value)
		.ok_or_else(|| WalletError::Serialization(format!("Invalid quantity: {}", value)))
}

fn convert_receipt(receipt: &RpcReceipt) -> TransactionReceipt {
	let logs = serde_json::to_value(receipt)
		.ok()
		.and_then(|v| v.get("logs").and_then(Value::as_array).cloned())
		.unwrap_or_default();

	TransactionReceipt {
		transaction_hash: hex::encode_prefixed(receipt.transaction_hash),
		block_number: receipt.block_number.unwrap_or_default(),
		block_hash: receipt
			.block_hash
			.map(hex::encode_prefixed)
			.unwrap_or_default(),
		from: receipt.from.to_checksum(None),
		to: receipt.to.map(|to| to.to_checksum(None)),
		status: if receipt.status() {
			ReceiptStatus::Success
		} else {
			ReceiptStatus::Failed
		},
		gas_used: receipt.gas_used.to_string(),
		effective_gas_price: Some(receipt.effective_gas_price.to_string()),
		logs,
	}
}

#[async_trait]
impl WalletAdapter for PrivateKeyAdapter {
	fn core(&self) -> &AdapterCore {
		&self.core
	}

	fn chain_family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn name(&self) -> &str {
		"Private Key (EVM)"
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities::all().without(Capability::AddChain)
	}

	async fn connect(&self, chain_id: Option<ChainId>) -> WalletResult<Account> {
		let key = self.key.lock().clone().ok_or_else(|| {
			WalletError::Configuration(
				"Private key not set. Call set_private_key() first.".to_string(),
			)
		})?;
		let chain_id = chain_id.unwrap_or(DEFAULT_CHAIN_ID);
		self.core.set_state(WalletState::Connecting);

		let opened = key
			.parse::<PrivateKeySigner>()
			.map_err(|e| WalletError::Configuration(format!("Invalid private key: {}", e)))
			.and_then(|signer| {
				let provider = self.build_provider(&signer, chain_id)?;
				Ok(LocalSession { signer, provider })
			});

		match opened {
			Ok(session) => {
				let address = session.signer.address().to_checksum(None);
				info!(%address, chain_id, "Private key wallet connected");
				*self.session.write() = Some(session);
				let account = Account::new(chain_id, address, ChainFamily::Evm);
				self.core.set_connected(account.clone());
				Ok(account)
			}
			Err(e) => {
				*self.session.write() = None;
				self.core.reset(WalletState::Error);
				Err(e)
			}
		}
	}

	async fn disconnect(&self) -> WalletResult<()> {
		*self.key.lock() = None;
		*self.session.write() = None;
		self.core.disconnect();
		Ok(())
	}

	async fn is_available(&self) -> bool {
		true
	}

	fn provider(&self) -> ProviderHandle {
		match self.session.read().as_ref().and_then(|s| s.provider.clone()) {
			Some(provider) => ProviderHandle::Rpc(provider),
			None => ProviderHandle::Unavailable,
		}
	}

	fn signer(&self) -> WalletResult<ProviderHandle> {
		self.local_signer().map(ProviderHandle::LocalSigner)
	}

	async fn sign_message(&self, message: &str) -> WalletResult<String> {
		let signer = self.local_signer()?;
		let signature = signer
			.sign_message(message.as_bytes())
			.await
			.map_err(signing_error)?;
		Ok(hex::encode_prefixed(signature.as_bytes()))
	}

	async fn sign_typed_data(&self, typed_data: &Value) -> WalletResult<String> {
		let signer = self.local_signer()?;
		let typed: TypedData = serde_json::from_value(typed_data.clone())?;
		let signature = signer
			.sign_dynamic_typed_data(&typed)
			.await
			.map_err(signing_error)?;
		Ok(hex::encode_prefixed(signature.as_bytes()))
	}

	async fn sign_transaction(&self, transaction: &Transaction) -> WalletResult<String> {
		let signer = self.local_signer()?;
		let account = self.core.ensure_connected()?;
		match transaction {
			Transaction::Evm(tx) => {
				let chain_id = tx.chain_id.unwrap_or(account.chain_id);
				self.sign_evm_transaction(&signer, tx, chain_id).await
			}
			Transaction::Tron(_) => Err(WalletError::Configuration(
				"The EVM private key wallet cannot sign Tron transactions".to_string(),
			)),
		}
	}

	async fn switch_chain(&self, chain_id: ChainId) -> WalletResult<()> {
		let signer = self.local_signer()?;
		let provider = self.build_provider(&signer, chain_id)?;
		if let Some(session) = self.session.write().as_mut() {
			session.provider = provider;
		}
		self.core.change_chain(chain_id);
		Ok(())
	}

	async fn read_contract(&self, params: &ContractReadParams) -> WalletResult<Value> {
		let (account, provider) = self.rpc()?;
		let from = parse_address(&account.native_address)?;
		let (function, request) = Self::contract_request(from, params)?;

		let output = provider
			.call(request)
			.await
			.map_err(|e| rpc_error("eth_call", e))?;
		decode_output(&function, &output)
	}

	async fn write_contract(&self, params: &ContractWriteParams) -> WalletResult<String> {
		let (account, provider) = self.rpc()?;
		let request = Self::write_request(parse_address(&account.native_address)?, params)?;

		let pending = provider
			.send_transaction(request)
			.await
			.map_err(|e| rpc_error("eth_sendTransaction", e))?;
		let tx_hash = hex::encode_prefixed(pending.tx_hash());
		info!(%tx_hash, "Contract transaction sent");
		Ok(tx_hash)
	}

	async fn estimate_gas(&self, params: &ContractWriteParams) -> WalletResult<u64> {
		let (account, provider) = self.rpc()?;
		let request = Self::write_request(parse_address(&account.native_address)?, params)?;

		provider
			.estimate_gas(request)
			.await
			.map_err(|e| rpc_error("eth_estimateGas", e))
	}

	async fn wait_for_transaction(
		&self,
		tx_hash: &str,
		required: u64,
	) -> WalletResult<TransactionReceipt> {
		let (_, provider) = self.rpc()?;
		let hash: TxHash = tx_hash
			.parse()
			.map_err(|e| WalletError::Serialization(format!("Invalid transaction hash: {}", e)))?;

		loop {
			let receipt = provider
				.get_transaction_receipt(hash)
				.await
				.map_err(|e| rpc_error("eth_getTransactionReceipt", e))?;

			if let Some(receipt) = receipt {
				let receipt = convert_receipt(&receipt);
				if !receipt.is_success() {
					return Err(WalletError::transaction_failed(
						tx_hash,
						Some("Transaction reverted"),
					));
				}
				if required <= 1 {
					return Ok(receipt);
				}
				let head = provider
					.get_block_number()
					.await
					.map_err(|e| rpc_error("eth_blockNumber", e))?;
				if confirmations(receipt.block_number, head) >= required {
					return Ok(receipt);
				}
			}

			tokio::time::sleep(self.receipt_poll_interval).await;
		}
	}
}
