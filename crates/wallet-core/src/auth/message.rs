use chrono::{DateTime, SecondsFormat, Utc};
use wallet_types::{ChainFamily, ChainId, WalletError, WalletResult};

/// 16 random bytes, hex encoded.
pub fn generate_nonce() -> String {
	let bytes: [u8; 16] = rand::random();
	hex::encode(bytes)
}

/// Builds the text a user signs to prove control of an address.
#[derive(Debug, Clone)]
pub struct AuthMessageGenerator {
	domain: String,
}

impl AuthMessageGenerator {
	pub fn new(domain: impl Into<String>) -> Self {
		Self {
			domain: domain.into(),
		}
	}

	pub fn domain(&self) -> &str {
		&self.domain
	}

	/// Sign-in message for `family`. `timestamp` is Unix time in milliseconds.
	pub fn generate(
		&self,
		family: ChainFamily,
		nonce: &str,
		chain_id: ChainId,
		timestamp: i64,
		statement: Option<&str>,
	) -> WalletResult<String> {
		let header = match family {
			ChainFamily::Evm => format!("{} wants you to sign in.", self.domain),
			ChainFamily::Tron => format!(
				"{} wants you to sign in with your Tron account.",
				self.domain
			),
			other => {
				return Err(WalletError::Configuration(format!(
					"Unsupported chain family: {}",
					other
				)))
			}
		};
		let issued_at = DateTime::<Utc>::from_timestamp_millis(timestamp).ok_or_else(|| {
			WalletError::Configuration(format!("Timestamp out of range: {}", timestamp))
		})?;

		let mut lines = vec![header, String::new()];
		if let Some(statement) = statement.filter(|s| !s.is_empty()) {
			lines.push(statement.to_string());
			lines.push(String::new());
		}
		lines.push(format!("Nonce: {}", nonce));
		lines.push(format!("Chain ID: {}", chain_id));
		lines.push(format!(
			"Issued At: {}",
			issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
		));

		Ok(lines.join("\n"))
	}

	/// Same as [`AuthMessageGenerator::generate`], issued now.
	pub fn generate_now(
		&self,
		family: ChainFamily,
		nonce: &str,
		chain_id: ChainId,
		statement: Option<&str>,
	) -> WalletResult<String> {
		self.generate(
			family,
			nonce,
			chain_id,
			Utc::now().timestamp_millis(),
			statement,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ISSUED: i64 = 1_704_067_200_000;

	#[test]
	fn test_evm_message_layout() {
		let message = AuthMessageGenerator::new("app.example.com")
			.generate(ChainFamily::Evm, "abc123", 1, ISSUED, None)
			.unwrap();

		assert_eq!(
			message,
			"app.example.com wants you to sign in.\n\nNonce: abc123\nChain ID: 1\nIssued At: 2024-01-01T00:00:00.000Z"
		);
	}

	#[test]
	fn test_tron_message_with_statement() {
		let message = AuthMessageGenerator::new("app.example.com")
			.generate(ChainFamily::Tron, "n1", 195, ISSUED + 42, Some("Welcome back"))
			.unwrap();

		let lines: Vec<&str> = message.lines().collect();
		assert_eq!(
			lines[0],
			"app.example.com wants you to sign in with your Tron account."
		);
		assert_eq!(lines[2], "Welcome back");
		assert_eq!(lines[3], "");
		assert_eq!(lines[6], "Issued At: 2024-01-01T00:00:00.042Z");
	}

	#[test]
	fn test_nonce_is_32_hex_chars() {
		let nonce = generate_nonce();
		assert_eq!(nonce.len(), 32);
		assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
		assert_ne!(nonce, generate_nonce());
	}
}
