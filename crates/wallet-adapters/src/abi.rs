//! JSON ABI helpers for contract calls.
//!
//! Contract parameters arrive as JSON (an ABI array plus JSON arguments).
//! These helpers resolve the function fragment, coerce the arguments against
//! the declared parameter types and render decoded return values back to
//! JSON. Integers are rendered as decimal strings and byte values as
//! `0x`-prefixed hex.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::hex;
use alloy::json_abi::{Function, JsonAbi};
use serde_json::Value;
use wallet_types::{WalletError, WalletResult};

fn abi_error(message: impl std::fmt::Display) -> WalletError {
	WalletError::Serialization(format!("ABI error: {}", message))
}

/// Parses a JSON ABI. A single fragment object is accepted as well.
pub fn parse_abi(abi: &Value) -> WalletResult<JsonAbi> {
	let fragments = match abi {
		Value::Array(_) => abi.clone(),
		Value::Object(_) => Value::Array(vec![abi.clone()]),
		_ => return Err(abi_error("expected an array of fragments")),
	};
	serde_json::from_value(fragments).map_err(abi_error)
}

/// Finds `name` in `abi`, picking the overload that takes `arg_count` inputs.
pub fn resolve_function(abi: &Value, name: &str, arg_count: usize) -> WalletResult<Function> {
	let abi = parse_abi(abi)?;
	let overloads = abi
		.function(name)
		.ok_or_else(|| abi_error(format!("function {} not found", name)))?;

	overloads
		.iter()
		.find(|f| f.inputs.len() == arg_count)
		.cloned()
		.ok_or_else(|| {
			abi_error(format!(
				"function {} does not take {} argument(s)",
				name, arg_count
			))
		})
}

/// Converts one JSON argument into a value of type `ty`.
pub fn json_to_sol(ty: &DynSolType, value: &Value) -> WalletResult<DynSolValue> {
	match (ty, value) {
		(DynSolType::Array(inner), Value::Array(items)) => items
			.iter()
			.map(|item| json_to_sol(inner, item))
			.collect::<WalletResult<Vec<_>>>()
			.map(DynSolValue::Array),
		(DynSolType::FixedArray(inner, len), Value::Array(items)) => {
			if items.len() != *len {
				return Err(abi_error(format!(
					"expected {} elements, got {}",
					len,
					items.len()
				)));
			}
			items
				.iter()
				.map(|item| json_to_sol(inner, item))
				.collect::<WalletResult<Vec<_>>>()
				.map(DynSolValue::FixedArray)
		}
		(DynSolType::Tuple(types), Value::Array(items)) => {
			if items.len() != types.len() {
				return Err(abi_error(format!(
					"expected a tuple of {}, got {}",
					types.len(),
					items.len()
				)));
			}
			types
				.iter()
				.zip(items)
				.map(|(t, v)| json_to_sol(t, v))
				.collect::<WalletResult<Vec<_>>>()
				.map(DynSolValue::Tuple)
		}
		(_, Value::String(s)) => ty.coerce_str(s).map_err(abi_error),
		(_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(abi_error),
		(_, Value::Bool(b)) => ty.coerce_str(if *b { "true" } else { "false" }).map_err(abi_error),
		_ => Err(abi_error(format!("cannot encode {} as {}", value, ty))),
	}
}

/// ABI-encodes a call to `function` (selector included).
pub fn encode_call(function: &Function, args: &[Value]) -> WalletResult<Vec<u8>> {
	let values = function
		.inputs
		.iter()
		.zip(args)
		.map(|(param, arg)| {
			let ty = param.resolve().map_err(abi_error)?;
			json_to_sol(&ty, arg)
		})
		.collect::<WalletResult<Vec<_>>>()?;

	function.abi_encode_input(&values).map_err(abi_error)
}

/// Decodes return data. A single return value is unwrapped, several are
/// returned as a JSON array.
pub fn decode_output(function: &Function, data: &[u8]) -> WalletResult<Value> {
	let mut values = function.abi_decode_output(data).map_err(abi_error)?;
	if values.len() == 1 {
		Ok(sol_to_json(&values.remove(0)))
	} else {
		Ok(Value::Array(values.iter().map(sol_to_json).collect()))
	}
}

pub fn sol_to_json(value: &DynSolValue) -> Value {
	match value {
		DynSolValue::Bool(b) => Value::Bool(*b),
		DynSolValue::Int(i, _) => Value::String(i.to_string()),
		DynSolValue::Uint(u, _) => Value::String(u.to_string()),
		DynSolValue::FixedBytes(word, size) => Value::String(hex::encode_prefixed(&word[..*size])),
		DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
		DynSolValue::Function(f) => Value::String(hex::encode_prefixed(f)),
		DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
		DynSolValue::String(s) => Value::String(s.clone()),
		DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
			Value::Array(items.iter().map(sol_to_json).collect())
		}
		other => other
			.as_fixed_seq()
			.map(|items| Value::Array(items.iter().map(sol_to_json).collect()))
			.unwrap_or(Value::Null),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn erc20_abi() -> Value {
		json!([
			{
				"type": "function",
				"name": "balanceOf",
				"stateMutability": "view",
				"inputs": [{ "name": "owner", "type": "address" }],
				"outputs": [{ "name": "", "type": "uint256" }]
			},
			{
				"type": "function",
				"name": "transfer",
				"stateMutability": "nonpayable",
				"inputs": [
					{ "name": "to", "type": "address" },
					{ "name": "amount", "type": "uint256" }
				],
				"outputs": [{ "name": "", "type": "bool" }]
			}
		])
	}

	#[test]
	fn test_encode_balance_of() {
		let function = resolve_function(&erc20_abi(), "balanceOf", 1).unwrap();
		let data = encode_call(
			&function,
			&[json!("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")],
		)
		.unwrap();

		assert_eq!(data.len(), 4 + 32);
		assert_eq!(hex::encode(&data[..4]), "70a08231");
		assert_eq!(
			hex::encode(&data[16..]),
			"5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
		);
	}

	#[test]
	fn test_numeric_arguments_accept_strings_and_numbers() {
		let function = resolve_function(&erc20_abi(), "transfer", 2).unwrap();
		let to = json!("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

		let from_string = encode_call(&function, &[to.clone(), json!("1000")]).unwrap();
		let from_number = encode_call(&function, &[to, json!(1000)]).unwrap();
		assert_eq!(from_string, from_number);
	}

	#[test]
	fn test_decode_single_output_is_unwrapped() {
		let function = resolve_function(&erc20_abi(), "balanceOf", 1).unwrap();
		let mut word = [0u8; 32];
		word[30] = 0x03;
		word[31] = 0xe8;

		assert_eq!(decode_output(&function, &word).unwrap(), json!("1000"));
	}

	#[test]
	fn test_unknown_function_and_arity() {
		assert!(resolve_function(&erc20_abi(), "approve", 2).is_err());
		assert!(resolve_function(&erc20_abi(), "transfer", 1).is_err());
		assert!(parse_abi(&json!("nope")).is_err());
	}
}
