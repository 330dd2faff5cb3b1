//! EVM address and hex-quantity helpers.

use crate::errors::WalletError;
use alloy::primitives::Address;
use std::str::FromStr;

fn parse(address: &str) -> Option<Address> {
	let body = address.strip_prefix("0x")?;
	if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
		return None;
	}
	Address::from_str(address).ok()
}

/// True for `0x` + 40 hex digits. Mixed-case input must carry a valid EIP-55
/// checksum; all-lowercase and all-uppercase input is accepted as is.
pub fn is_valid_evm_address(address: &str) -> bool {
	let Some(parsed) = parse(address) else {
		return false;
	};
	let body = &address[2..];
	let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
	let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
	if has_lower && has_upper {
		return parsed.to_checksum(None) == address;
	}
	true
}

/// Returns the EIP-55 checksummed form.
pub fn format_evm_address(address: &str) -> Result<String, WalletError> {
	if !is_valid_evm_address(address) {
		return Err(WalletError::InvalidAddress(address.to_string()));
	}
	parse(address)
		.map(|a| a.to_checksum(None))
		.ok_or_else(|| WalletError::InvalidAddress(address.to_string()))
}

pub fn compare_evm_addresses(a: &str, b: &str) -> bool {
	match (parse(a), parse(b)) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}

/// `0x1234...5678` style display form. Invalid input is returned unchanged.
pub fn shorten_address(address: &str, chars: usize) -> String {
	match format_evm_address(address) {
		Ok(formatted) if chars < 20 => format!(
			"{}...{}",
			&formatted[..chars + 2],
			&formatted[42 - chars..]
		),
		_ => address.to_string(),
	}
}

pub fn ensure_hex_prefix(value: &str) -> String {
	if value.starts_with("0x") {
		value.to_string()
	} else {
		format!("0x{}", value)
	}
}

pub fn strip_hex_prefix(value: &str) -> &str {
	value.strip_prefix("0x").unwrap_or(value)
}

/// `0x` followed by zero or more hex digits.
pub fn is_hex(value: &str) -> bool {
	value
		.strip_prefix("0x")
		.is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_hexdigit()))
}

pub fn number_to_hex(value: u128) -> String {
	format!("0x{:x}", value)
}

/// Parses a JSON-RPC quantity: `0x`-prefixed hex, or plain decimal.
pub fn parse_quantity(value: &str) -> Option<u128> {
	match value.strip_prefix("0x") {
		Some("") => None,
		Some(hex) => u128::from_str_radix(hex, 16).ok(),
		None => value.parse().ok(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

	#[test]
	fn test_validity() {
		assert!(is_valid_evm_address(CHECKSUMMED));
		assert!(is_valid_evm_address(&CHECKSUMMED.to_lowercase()));
		assert!(!is_valid_evm_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
		assert!(!is_valid_evm_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
		assert!(!is_valid_evm_address("0x1234"));
	}

	#[test]
	fn test_format_and_compare() {
		assert_eq!(
			format_evm_address(&CHECKSUMMED.to_lowercase()).unwrap(),
			CHECKSUMMED
		);
		assert!(format_evm_address("0xnothex").is_err());
		assert!(compare_evm_addresses(CHECKSUMMED, &CHECKSUMMED.to_lowercase()));
		assert!(!compare_evm_addresses(CHECKSUMMED, "garbage"));
	}

	#[test]
	fn test_shorten() {
		assert_eq!(shorten_address(CHECKSUMMED, 4), "0x5aAe...eAed");
		assert_eq!(shorten_address("not-an-address", 4), "not-an-address");
	}

	#[test]
	fn test_quantities() {
		assert_eq!(parse_quantity("0x1"), Some(1));
		assert_eq!(parse_quantity("0xaa36a7"), Some(11155111));
		assert_eq!(parse_quantity("42"), Some(42));
		assert_eq!(parse_quantity("0x"), None);
		assert_eq!(number_to_hex(137), "0x89");
		assert!(is_hex("0x"));
		assert!(!is_hex("12"));
		assert_eq!(ensure_hex_prefix("ab"), "0xab");
		assert_eq!(strip_hex_prefix("0xab"), "ab");
	}
}
