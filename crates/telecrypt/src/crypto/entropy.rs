//! Secure random source for nonce generation.

use rand_core::{CryptoRng, OsRng, RngCore};

use crate::error::FrameError;

/// Source of cryptographically unpredictable bytes.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource {
    /// Fill `buf` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Entropy`] if the source cannot deliver.
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), FrameError>;
}

/// Adapter from any `rand_core` CSPRNG to [`RandomSource`].
///
/// The `CryptoRng` bound keeps non-cryptographic generators out of nonce
/// generation.
#[derive(Debug, Clone, Default)]
pub struct CryptoRandom<R>(R);

impl<R: RngCore + CryptoRng> CryptoRandom<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

/// The operating system's CSPRNG.
pub type OsRandom = CryptoRandom<OsRng>;

impl OsRandom {
    pub fn os() -> Self {
        CryptoRandom(OsRng)
    }
}

impl<R: RngCore + CryptoRng> RandomSource for CryptoRandom<R> {
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), FrameError> {
        self.0.try_fill_bytes(buf).map_err(|_| FrameError::Entropy)
    }
}
