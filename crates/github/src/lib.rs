//! GitHub side of the relay: request verification and push payload decoding.

pub mod push;
pub mod webhook;

pub use push::{DecodeError, decode_push};
pub use webhook::{GitHubSignature, VerificationError, Verifier, delivery};
