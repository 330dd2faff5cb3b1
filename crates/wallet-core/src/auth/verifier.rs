use alloy::primitives::{Address, Signature};
use tracing::{debug, warn};
use wallet_types::address::evm::strip_hex_prefix;
use wallet_types::ChainFamily;

/// Checks sign-in signatures against the address that claims them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
	pub fn new() -> Self {
		Self
	}

	/// Whether `signature` over `message` was produced by `expected`.
	///
	/// Malformed input verifies as `false`. Tron signatures are not
	/// verified yet and always return `false`.
	pub fn verify(
		&self,
		message: &str,
		signature: &str,
		expected: &str,
		family: ChainFamily,
	) -> bool {
		match family {
			ChainFamily::Evm => match recover_signer(message, signature) {
				Some(recovered) => expected
					.parse::<Address>()
					.is_ok_and(|expected| expected == recovered),
				None => false,
			},
			_ => {
				warn!(%family, "Signature verification is not implemented for this chain family");
				false
			}
		}
	}
}

/// Recovers the EIP-191 personal-message signer.
fn recover_signer(message: &str, signature: &str) -> Option<Address> {
	let bytes = hex::decode(strip_hex_prefix(signature))
		.map_err(|e| debug!(error = %e, "Signature is not hex"))
		.ok()?;
	let signature = Signature::try_from(bytes.as_slice())
		.map_err(|e| debug!(error = %e, "Malformed signature"))
		.ok()?;
	signature
		.recover_address_from_msg(message)
		.map_err(|e| debug!(error = %e, "Signature recovery failed"))
		.ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::signers::local::PrivateKeySigner;
	use alloy::signers::SignerSync;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn sign(message: &str) -> String {
		let signer: PrivateKeySigner = KEY.parse().unwrap();
		let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
		format!("0x{}", hex::encode(signature.as_bytes()))
	}

	#[test]
	fn test_evm_signature_recovers_signer() {
		let verifier = SignatureVerifier::new();
		let signature = sign("hello");

		assert!(verifier.verify("hello", &signature, ADDRESS, ChainFamily::Evm));
		assert!(verifier.verify(
			"hello",
			&signature,
			&ADDRESS.to_lowercase(),
			ChainFamily::Evm
		));
		assert!(!verifier.verify("hello!", &signature, ADDRESS, ChainFamily::Evm));
		assert!(!verifier.verify(
			"hello",
			&signature,
			"0x0000000000000000000000000000000000000001",
			ChainFamily::Evm
		));
	}

	#[test]
	fn test_malformed_input_is_rejected() {
		let verifier = SignatureVerifier::new();

		assert!(!verifier.verify("hello", "0xzz", ADDRESS, ChainFamily::Evm));
		assert!(!verifier.verify("hello", "0x1234", ADDRESS, ChainFamily::Evm));
		assert!(!verifier.verify("hello", &sign("hello"), "not-an-address", ChainFamily::Evm));
	}

	#[test]
	fn test_tron_verification_is_unsupported() {
		let verifier = SignatureVerifier::new();
		assert!(!verifier.verify(
			"hello",
			&sign("hello"),
			"TJRabPrwbZy45sbavfcjinPJC18kjpRTv8",
			ChainFamily::Tron
		));
	}
}
