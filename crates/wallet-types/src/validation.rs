//! Format validation for addresses, chain ids, signatures and hashes.

use crate::account::{ChainFamily, ChainId};
use crate::address::evm::is_valid_evm_address;
use crate::address::tron::is_valid_tron_address;
use crate::chains::chain_family;

fn is_hex_of_len(value: &str, len: usize) -> bool {
	value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn validate_address(address: &str, family: ChainFamily) -> bool {
	match family {
		ChainFamily::Evm => is_valid_evm_address(address),
		ChainFamily::Tron => is_valid_tron_address(address),
	}
}

/// Validates against the family of a built-in chain. Unknown chains fail.
pub fn validate_address_for_chain(address: &str, chain_id: ChainId) -> bool {
	chain_family(chain_id).is_some_and(|family| validate_address(address, family))
}

pub fn is_valid_chain_id(chain_id: ChainId) -> bool {
	chain_id > 0
}

/// A 65-byte hex signature with `0x` prefix.
pub fn is_valid_signature(signature: &str) -> bool {
	signature
		.strip_prefix("0x")
		.is_some_and(|hex| is_hex_of_len(hex, 130))
}

/// EVM hashes carry a `0x` prefix, Tron transaction ids do not.
pub fn is_valid_transaction_hash(hash: &str, family: ChainFamily) -> bool {
	match family {
		ChainFamily::Evm => hash
			.strip_prefix("0x")
			.is_some_and(|hex| is_hex_of_len(hex, 64)),
		ChainFamily::Tron => is_hex_of_len(hash, 64),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_address_by_family_and_chain() {
		let evm = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
		let tron = "TJmmqjb1DK9TTZbQXzRQ2AuA94z4gKAPFh";

		assert!(validate_address(evm, ChainFamily::Evm));
		assert!(!validate_address(evm, ChainFamily::Tron));
		assert!(validate_address_for_chain(tron, 195));
		assert!(!validate_address_for_chain(evm, 195));
		assert!(!validate_address_for_chain(evm, 31337));
	}

	#[test]
	fn test_signature_and_hash_formats() {
		let sig = format!("0x{}", "ab".repeat(65));
		assert!(is_valid_signature(&sig));
		assert!(!is_valid_signature(&sig[2..]));

		let hash = "cd".repeat(32);
		assert!(is_valid_transaction_hash(&format!("0x{hash}"), ChainFamily::Evm));
		assert!(!is_valid_transaction_hash(&hash, ChainFamily::Evm));
		assert!(is_valid_transaction_hash(&hash, ChainFamily::Tron));
		assert!(!is_valid_chain_id(0));
	}
}
