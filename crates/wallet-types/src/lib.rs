//! Shared types for the multi-chain wallet connector.
//!
//! This crate holds the value objects, error taxonomy, event definitions and
//! static chain metadata used by adapters, the wallet manager and any
//! consumer of the manager's public surface.

pub mod account;
pub mod address;
pub mod chains;
pub mod contract;
pub mod errors;
pub mod events;
pub mod validation;

pub use account::*;
pub use chains::{ChainInfo, ChainRegistry, NativeCurrency};
pub use contract::*;
pub use errors::*;
pub use events::*;
