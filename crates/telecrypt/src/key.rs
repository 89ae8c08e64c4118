//! [`FrameKey`]: the 256-bit ChaCha20-Poly1305 key shared with the device.
//!
//! The key is provisioned as a 64-character hex string and decoded exactly once
//! at startup. It is immutable afterwards; there is no rotation.

use std::fmt;
use std::str::FromStr;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::KeyError;

/// Byte length of a ChaCha20 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Length of the hex form of a key.
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// Raw key bytes, overwritten with zeroes when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct FrameKey([u8; KEY_LEN]);

impl FrameKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a key from its 64-character hex form. See [`parse_hex_key`].
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        parse_hex_key(encoded)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("FrameKey([REDACTED])")
    }
}

impl FromStr for FrameKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_key(s)
    }
}

/// Decode a 64-character hex string (either case) into a [`FrameKey`].
///
/// # Errors
///
/// Returns [`KeyError::InvalidLength`] if `encoded` is not exactly
/// [`KEY_HEX_LEN`] characters, and [`KeyError::InvalidCharacter`] with the
/// position of the first non-hex character otherwise.
pub fn parse_hex_key(encoded: &str) -> Result<FrameKey, KeyError> {
    if encoded.len() != KEY_HEX_LEN {
        return Err(KeyError::wrong_length(encoded.len()));
    }

    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    hex::decode_to_slice(encoded, &mut bytes[..]).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            KeyError::InvalidCharacter { index }
        }
        // Length was checked above.
        _ => KeyError::InvalidCharacter {
            index: first_non_hex(encoded),
        },
    })?;

    Ok(FrameKey(*bytes))
}

fn first_non_hex(encoded: &str) -> usize {
    encoded
        .char_indices()
        .find(|(_, c)| !c.is_ascii_hexdigit())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_HEX: &str = "d38a3b96a26d0b1139bd30c174884f5dbc8eaaf492493725633ecebfa4ab19e9";

    #[test]
    fn parses_valid_key() {
        let key = parse_hex_key(TEST_KEY_HEX).unwrap();
        assert_eq!(key.as_bytes()[0], 0xd3);
        assert_eq!(key.as_bytes()[31], 0xe9);
    }

    #[test]
    fn accepts_uppercase() {
        let upper = TEST_KEY_HEX.to_ascii_uppercase();
        assert_eq!(
            parse_hex_key(&upper).unwrap(),
            parse_hex_key(TEST_KEY_HEX).unwrap()
        );
    }

    #[test]
    fn all_zero_key() {
        let key: FrameKey = "0".repeat(KEY_HEX_LEN).parse().unwrap();
        assert_eq!(key, FrameKey::from_bytes([0u8; KEY_LEN]));
    }

    #[test]
    fn rejects_short_key() {
        assert_eq!(
            parse_hex_key(&TEST_KEY_HEX[..62]),
            Err(KeyError::InvalidLength {
                expected: 64,
                actual: 62
            })
        );
    }

    #[test]
    fn rejects_long_key() {
        let long = format!("{TEST_KEY_HEX}00");
        assert!(matches!(
            parse_hex_key(&long),
            Err(KeyError::InvalidLength { actual: 66, .. })
        ));
    }

    #[test]
    fn rejects_empty_key() {
        assert!(parse_hex_key("").is_err());
    }

    #[test]
    fn rejects_non_hex_character() {
        let mut bad = TEST_KEY_HEX.to_string();
        bad.replace_range(10..11, "g");
        assert_eq!(
            parse_hex_key(&bad),
            Err(KeyError::InvalidCharacter { index: 10 })
        );
    }

    #[test]
    fn rejects_multibyte_character_of_right_byte_length() {
        // 62 ASCII digits plus one two-byte character is 64 bytes long.
        let bad = format!("{}é", &TEST_KEY_HEX[..62]);
        assert_eq!(bad.len(), KEY_HEX_LEN);
        assert!(matches!(
            parse_hex_key(&bad),
            Err(KeyError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        let padded = format!(" {}", &TEST_KEY_HEX[..63]);
        assert!(parse_hex_key(&padded).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let key = parse_hex_key(TEST_KEY_HEX).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("d3"));
    }

    #[test]
    fn zeroize_clears_bytes() {
        let mut key = FrameKey::from_bytes([0x42; KEY_LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }
}
