//! Conversion of JSON-RPC transaction receipts.

use serde_json::Value;
use wallet_types::address::evm::parse_quantity;
use wallet_types::{ReceiptStatus, TransactionReceipt, WalletError, WalletResult};

fn field<'a>(receipt: &'a Value, name: &str) -> Option<&'a str> {
	receipt.get(name).and_then(Value::as_str)
}

fn quantity(receipt: &Value, name: &str) -> WalletResult<u128> {
	field(receipt, name)
		.and_then(parse_quantity)
		.ok_or_else(|| WalletError::Serialization(format!("Receipt field {} is missing or invalid", name)))
}

/// Builds a [`TransactionReceipt`] from an `eth_getTransactionReceipt` result.
pub fn parse_rpc_receipt(receipt: &Value) -> WalletResult<TransactionReceipt> {
	let status = match field(receipt, "status") {
		Some("0x0") => ReceiptStatus::Failed,
		_ => ReceiptStatus::Success,
	};
	let block_number = u64::try_from(quantity(receipt, "blockNumber")?)
		.map_err(|e| WalletError::Serialization(e.to_string()))?;

	Ok(TransactionReceipt {
		transaction_hash: field(receipt, "transactionHash").unwrap_or_default().to_string(),
		block_number,
		block_hash: field(receipt, "blockHash").unwrap_or_default().to_string(),
		from: field(receipt, "from").unwrap_or_default().to_string(),
		to: field(receipt, "to").map(str::to_string),
		status,
		gas_used: quantity(receipt, "gasUsed")?.to_string(),
		effective_gas_price: field(receipt, "effectiveGasPrice")
			.and_then(parse_quantity)
			.map(|p| p.to_string()),
		logs: receipt
			.get("logs")
			.and_then(Value::as_array)
			.cloned()
			.unwrap_or_default(),
	})
}

/// Number of confirmations a receipt mined in `mined_at` has at `head`.
pub fn confirmations(mined_at: u64, head: u64) -> u64 {
	head.saturating_sub(mined_at) + 1
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_parse_successful_receipt() {
		let receipt = parse_rpc_receipt(&json!({
			"transactionHash": "0xabc",
			"blockNumber": "0x10",
			"blockHash": "0xdef",
			"from": "0x1",
			"to": "0x2",
			"status": "0x1",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x3b9aca00",
			"logs": [{ "data": "0x" }]
		}))
		.unwrap();

		assert!(receipt.is_success());
		assert_eq!(receipt.block_number, 16);
		assert_eq!(receipt.gas_used, "21000");
		assert_eq!(receipt.effective_gas_price.as_deref(), Some("1000000000"));
		assert_eq!(receipt.logs.len(), 1);
	}

	#[test]
	fn test_reverted_and_malformed_receipts() {
		let reverted = parse_rpc_receipt(&json!({
			"blockNumber": "0x1",
			"gasUsed": "0x0",
			"status": "0x0"
		}))
		.unwrap();
		assert_eq!(reverted.status, ReceiptStatus::Failed);
		assert!(reverted.to.is_none());

		assert!(parse_rpc_receipt(&json!({ "gasUsed": "0x0" })).is_err());
	}

	#[test]
	fn test_confirmations() {
		assert_eq!(confirmations(10, 10), 1);
		assert_eq!(confirmations(10, 12), 3);
		assert_eq!(confirmations(10, 9), 1);
	}
}
