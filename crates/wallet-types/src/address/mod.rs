//! Address helpers for the supported chain families.

pub mod evm;
pub mod tron;
pub mod universal;

pub use universal::{
	compare_universal_addresses, create_universal_address, parse_universal_address,
	ParsedUniversalAddress,
};
