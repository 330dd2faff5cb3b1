//! Universal addresses: `"<chainId>:<nativeAddress>"`.

use crate::account::{ChainId, UniversalAddress};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUniversalAddress {
	pub chain_id: ChainId,
	pub address: String,
}

pub fn create_universal_address(chain_id: ChainId, address: &str) -> UniversalAddress {
	format!("{}:{}", chain_id, address)
}

/// Splits a universal address. Returns `None` unless there is exactly one
/// colon and the part before it is a decimal chain id.
pub fn parse_universal_address(universal: &str) -> Option<ParsedUniversalAddress> {
	let (chain, address) = universal.split_once(':')?;
	if address.contains(':') || chain.is_empty() || !chain.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let chain_id = chain.parse().ok()?;
	Some(ParsedUniversalAddress {
		chain_id,
		address: address.to_string(),
	})
}

pub fn is_valid_universal_address(universal: &str) -> bool {
	parse_universal_address(universal).is_some()
}

pub fn chain_id_of(universal: &str) -> Option<ChainId> {
	parse_universal_address(universal).map(|p| p.chain_id)
}

pub fn address_of(universal: &str) -> Option<String> {
	parse_universal_address(universal).map(|p| p.address)
}

/// Case-insensitive comparison.
pub fn compare_universal_addresses(a: &str, b: &str) -> bool {
	a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_then_parse_returns_inputs() {
		let cases = [
			(0, ""),
			(1, "0xABCdef0000000000000000000000000000000001"),
			(195, "TJmmqjb1DK9TTZbQXzRQ2AuA94z4gKAPFh"),
			(u64::MAX, "anything-without-a-colon"),
		];

		for (chain_id, address) in cases {
			let universal = create_universal_address(chain_id, address);
			let parsed = parse_universal_address(&universal).unwrap();
			assert_eq!(parsed.chain_id, chain_id);
			assert_eq!(parsed.address, address);
		}
	}

	#[test]
	fn test_parse_rejects_malformed_input() {
		assert!(parse_universal_address("0xabc").is_none());
		assert!(parse_universal_address("1:0xabc:extra").is_none());
		assert!(parse_universal_address("eth:0xabc").is_none());
		assert!(parse_universal_address(":0xabc").is_none());
		assert!(parse_universal_address("-1:0xabc").is_none());
	}

	#[test]
	fn test_extractors_and_compare() {
		assert_eq!(chain_id_of("56:0xabc"), Some(56));
		assert_eq!(address_of("56:0xabc").as_deref(), Some("0xabc"));
		assert!(is_valid_universal_address("1:x"));
		assert!(compare_universal_addresses("1:0xABC", "1:0xabc"));
		assert!(!compare_universal_addresses("1:0xabc", "56:0xabc"));
	}
}
