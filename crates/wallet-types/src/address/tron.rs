//! Tron address helpers.
//!
//! Only format checks are provided; converting between the base58 and hex
//! encodings is left to the host wallet.

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Base58 form: `T` followed by 33 base58 characters.
pub fn is_valid_tron_address(address: &str) -> bool {
	address.len() == 34
		&& address.starts_with('T')
		&& address.bytes().all(|b| BASE58_ALPHABET.contains(&b))
}

/// Hex form: `41` followed by 40 hex digits.
pub fn is_valid_tron_hex_address(address: &str) -> bool {
	address.len() == 42
		&& address.starts_with("41")
		&& address[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Exact comparison; both sides must use the same encoding.
pub fn compare_tron_addresses(a: &str, b: &str) -> bool {
	a == b
}

/// `TJmm...d7PK` style display form. Invalid input is returned unchanged.
pub fn shorten_tron_address(address: &str, chars: usize) -> String {
	if !is_valid_tron_address(address) || chars >= 17 {
		return address.to_string();
	}
	format!("{}...{}", &address[..chars + 1], &address[34 - chars..])
}

#[cfg(test)]
mod tests {
	use super::*;

	const ADDRESS: &str = "TJmmqjb1DK9TTZbQXzRQ2AuA94z4gKAPFh";

	#[test]
	fn test_base58_validity() {
		assert!(is_valid_tron_address(ADDRESS));
		// '0' and 'O' are outside the base58 alphabet
		assert!(!is_valid_tron_address("TJmmqjb1DK9TTZbQXzRQ2AuA94z4gKAPF0"));
		assert!(!is_valid_tron_address("AJmmqjb1DK9TTZbQXzRQ2AuA94z4gKAPFh"));
		assert!(!is_valid_tron_address("TJmm"));
	}

	#[test]
	fn test_hex_validity() {
		assert!(is_valid_tron_hex_address(
			"41a614f803b6fd780986a42c78ec9c7f77e6ded13c"
		));
		assert!(!is_valid_tron_hex_address(
			"42a614f803b6fd780986a42c78ec9c7f77e6ded13c"
		));
	}

	#[test]
	fn test_shorten() {
		assert_eq!(shorten_tron_address(ADDRESS, 4), "TJmmq...APFh");
		assert_eq!(shorten_tron_address("short", 4), "short");
	}
}
