//! Cryptographic collaborators of the frame codec: the AEAD primitive and the
//! secure random source.
//!
//! This module knows nothing about frames. It provides the stateful
//! key/nonce/payload/tag operations that [`crate::frame`] sequences.

pub mod entropy;
pub mod primitive;

pub use entropy::{CryptoRandom, OsRandom, RandomSource};
pub use primitive::{AeadPrimitive, ChaChaPoly};

#[cfg(test)]
pub use entropy::MockRandomSource;
#[cfg(test)]
pub use primitive::MockAeadPrimitive;
