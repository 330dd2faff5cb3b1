//! Optional adapter capabilities as a fixed bit-set.

use std::fmt;

/// An optional operation of [`crate::WalletAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Capability {
	SignTransaction = 1 << 0,
	SignTypedData = 1 << 1,
	SwitchChain = 1 << 2,
	AddChain = 1 << 3,
	ReadContract = 1 << 4,
	WriteContract = 1 << 5,
	EstimateGas = 1 << 6,
	WaitForTransaction = 1 << 7,
	Signer = 1 << 8,
}

impl Capability {
	pub const ALL: [Capability; 9] = [
		Capability::SignTransaction,
		Capability::SignTypedData,
		Capability::SwitchChain,
		Capability::AddChain,
		Capability::ReadContract,
		Capability::WriteContract,
		Capability::EstimateGas,
		Capability::WaitForTransaction,
		Capability::Signer,
	];

	/// Name of the adapter method, as reported in `MethodNotSupported` errors.
	pub fn method_name(self) -> &'static str {
		match self {
			Self::SignTransaction => "signTransaction",
			Self::SignTypedData => "signTypedData",
			Self::SwitchChain => "switchChain",
			Self::AddChain => "addChain",
			Self::ReadContract => "readContract",
			Self::WriteContract => "writeContract",
			Self::EstimateGas => "estimateGas",
			Self::WaitForTransaction => "waitForTransaction",
			Self::Signer => "getSigner",
		}
	}
}

/// The optional capabilities an adapter variant supports, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u16);

impl Capabilities {
	pub const fn empty() -> Self {
		Self(0)
	}

	pub const fn all() -> Self {
		Self(0x1ff)
	}

	pub const fn with(self, capability: Capability) -> Self {
		Self(self.0 | capability as u16)
	}

	pub const fn without(self, capability: Capability) -> Self {
		Self(self.0 & !(capability as u16))
	}

	pub const fn supports(self, capability: Capability) -> bool {
		self.0 & capability as u16 != 0
	}

	pub fn iter(self) -> impl Iterator<Item = Capability> {
		Capability::ALL.into_iter().filter(move |c| self.supports(*c))
	}
}

impl FromIterator<Capability> for Capabilities {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		iter.into_iter().fold(Self::empty(), Self::with)
	}
}

impl fmt::Debug for Capabilities {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set()
			.entries(self.iter().map(Capability::method_name))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_set_operations() {
		let caps = Capabilities::empty()
			.with(Capability::SignTransaction)
			.with(Capability::SwitchChain);

		assert!(caps.supports(Capability::SwitchChain));
		assert!(!caps.supports(Capability::AddChain));
		assert!(!caps.without(Capability::SwitchChain).supports(Capability::SwitchChain));
		assert_eq!(caps.iter().count(), 2);
	}

	#[test]
	fn test_all_covers_every_capability() {
		let all = Capabilities::all();
		assert!(Capability::ALL.iter().all(|c| all.supports(*c)));
		assert_eq!(Capability::ALL.into_iter().collect::<Capabilities>(), all);
	}
}
