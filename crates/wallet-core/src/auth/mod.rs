//! Sign-in message generation and signature verification.

mod message;
mod verifier;

pub use message::{generate_nonce, AuthMessageGenerator};
pub use verifier::SignatureVerifier;
