//! Contract call, transaction and receipt types.
//!
//! ABI fragments and call arguments are carried as JSON values so that the
//! same parameters can be forwarded to an injected provider verbatim or parsed
//! into typed ABI items by a local signer.

use crate::account::ChainId;
use crate::chains::ChainInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for a read-only contract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReadParams {
	/// Contract address in the chain's native format.
	pub address: String,
	/// JSON ABI (array of fragments).
	pub abi: Value,
	pub function_name: String,
	#[serde(default)]
	pub args: Vec<Value>,
}

impl ContractReadParams {
	pub fn new(address: impl Into<String>, abi: Value, function_name: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			abi,
			function_name: function_name.into(),
			args: Vec::new(),
		}
	}

	pub fn with_args(mut self, args: Vec<Value>) -> Self {
		self.args = args;
		self
	}
}

/// Parameters for a state-changing contract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWriteParams {
	#[serde(flatten)]
	pub call: ContractReadParams,
	/// Native value to attach, in the smallest unit (decimal string).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
}

impl From<ContractReadParams> for ContractWriteParams {
	fn from(call: ContractReadParams) -> Self {
		Self {
			call,
			value: None,
			gas: None,
			gas_price: None,
		}
	}
}

/// An unsigned EVM transaction request. Numeric amounts are decimal or
/// `0x`-prefixed hex strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmTransaction {
	pub to: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<ChainId>,
}

impl EvmTransaction {
	/// EIP-1559 fee fields take precedence over a legacy gas price.
	pub fn is_eip1559(&self) -> bool {
		self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
	}
}

/// A Tron transaction as produced by TronWeb's transaction builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TronTransaction {
	#[serde(rename = "txID", default, skip_serializing_if = "Option::is_none")]
	pub tx_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_data: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_data_hex: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transaction {
	Evm(EvmTransaction),
	Tron(TronTransaction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
	Success,
	Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: String,
	pub block_number: u64,
	pub block_hash: String,
	pub from: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	pub status: ReceiptStatus,
	/// Decimal string.
	pub gas_used: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub effective_gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub logs: Vec<Value>,
}

impl TransactionReceipt {
	pub fn is_success(&self) -> bool {
		self.status == ReceiptStatus::Success
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChainCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// Chain description handed to `wallet_addEthereumChain`-style requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
	pub chain_id: ChainId,
	pub chain_name: String,
	pub native_currency: AddChainCurrency,
	pub rpc_urls: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub block_explorer_urls: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub icon_urls: Vec<String>,
}

impl From<&ChainInfo> for AddChainParams {
	fn from(info: &ChainInfo) -> Self {
		Self {
			chain_id: info.id,
			chain_name: info.name.clone(),
			native_currency: AddChainCurrency {
				name: info.native_currency.name.clone(),
				symbol: info.native_currency.symbol.clone(),
				decimals: info.native_currency.decimals,
			},
			rpc_urls: info.rpc_urls.clone(),
			block_explorer_urls: info.block_explorer_urls.clone(),
			icon_urls: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_write_params_flatten_read_params() {
		let params = ContractWriteParams {
			value: Some("1000".to_string()),
			..ContractReadParams::new("0xToken", json!([]), "transfer")
				.with_args(vec![json!("0xTo"), json!("5")])
				.into()
		};

		let value = serde_json::to_value(&params).unwrap();
		assert_eq!(value["functionName"], "transfer");
		assert_eq!(value["address"], "0xToken");
		assert_eq!(value["value"], "1000");
		assert!(value.get("gasPrice").is_none());
	}

	#[test]
	fn test_untagged_transaction_picks_tron_shape() {
		let tx: Transaction =
			serde_json::from_value(json!({ "txID": "abc", "raw_data_hex": "0a02" })).unwrap();
		match tx {
			Transaction::Tron(tron) => assert_eq!(tron.tx_id.as_deref(), Some("abc")),
			other => panic!("expected tron transaction, got {other:?}"),
		}

		let tx: Transaction = serde_json::from_value(json!({ "to": "0xabc", "value": "1" })).unwrap();
		assert!(matches!(tx, Transaction::Evm(_)));
	}

	#[test]
	fn test_add_chain_params_from_chain_info() {
		let info = crate::chains::chain_info(137).unwrap();
		let params = AddChainParams::from(&info);

		assert_eq!(params.chain_id, 137);
		assert_eq!(params.chain_name, "Polygon Mainnet");
		assert_eq!(params.native_currency.symbol, "MATIC");
		assert_eq!(params.block_explorer_urls, vec!["https://polygonscan.com"]);
	}
}
