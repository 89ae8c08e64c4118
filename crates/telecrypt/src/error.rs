//! Error types for frame encryption, decryption and key parsing.

use thiserror::Error;

use crate::key::KEY_HEX_LEN;

/// Failure of a single encrypt or decrypt call.
///
/// Every variant is local to the call that produced it. None of them carry
/// plaintext, key material or computed tags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame cannot hold a nonce and a tag. Rejected before any
    /// cryptographic operation.
    #[error("frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// The carried tag does not match the tag computed over the ciphertext.
    #[error("frame authentication failed")]
    AuthFailure,

    /// The primitive broke an assumption of the codec (tag size above
    /// [`MAX_TAG_LEN`](crate::frame::MAX_TAG_LEN), operations out of order). Fails closed.
    #[error("cipher configuration fault: {0}")]
    ConfigFault(&'static str),

    /// The caller's output buffer cannot hold the result.
    #[error("output buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The secure random source could not produce a nonce.
    #[error("secure random source failed")]
    Entropy,
}

impl FrameError {
    /// Short machine-readable label used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::TooShort { .. } => "too_short",
            FrameError::AuthFailure => "auth_failure",
            FrameError::ConfigFault(_) => "config_fault",
            FrameError::BufferTooSmall { .. } => "buffer_too_small",
            FrameError::Entropy => "entropy",
        }
    }
}

/// Failure to decode a hex-encoded key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The string is not exactly [`KEY_HEX_LEN`] characters long.
    #[error("invalid key length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A character is not a hex digit. The character itself is withheld.
    #[error("invalid hex character at position {index}")]
    InvalidCharacter { index: usize },
}

impl KeyError {
    pub(crate) fn wrong_length(actual: usize) -> Self {
        KeyError::InvalidLength {
            expected: KEY_HEX_LEN,
            actual,
        }
    }
}
