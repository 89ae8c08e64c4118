//! The AEAD primitive contract consumed by the frame codec, and its
//! ChaCha20-Poly1305 (RFC 8439) implementation.
//!
//! The primitive is stateful in the way embedded AEAD libraries are: load a
//! key, start a message with a nonce, run the payload through `encrypt` or
//! `decrypt`, then finalize with `compute_tag`. Tag *verification* is the
//! codec's job, not the primitive's, so that the comparison is done in one
//! place and in constant time.

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::Poly1305;
use zeroize::{Zeroize, Zeroizing};

use crate::error::FrameError;
use crate::frame::{NONCE_LEN, TAG_LEN};
use crate::key::{FrameKey, KEY_LEN};

/// Stateful authenticated cipher driven by the frame codec.
///
/// A single instance handles one message per nonce. Implementations must
/// zeroize key and keystream state in [`clear`](AeadPrimitive::clear).
#[cfg_attr(test, mockall::automock)]
pub trait AeadPrimitive {
    /// Load the key used by subsequent messages.
    fn set_key(&mut self, key: &FrameKey);

    /// Start a new message under `nonce`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ConfigFault`] if no key has been loaded.
    fn set_nonce(&mut self, nonce: &[u8; NONCE_LEN]) -> Result<(), FrameError>;

    /// Encrypt `buf` in place and feed the resulting ciphertext to the MAC.
    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), FrameError>;

    /// Feed the ciphertext in `buf` to the MAC, then decrypt it in place.
    ///
    /// The output is unauthenticated until the caller has compared the tag.
    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), FrameError>;

    /// Finalize the MAC for the current message and write the first
    /// `out.len()` bytes of the tag. Ends the message.
    fn compute_tag(&mut self, out: &mut [u8]) -> Result<(), FrameError>;

    /// Full tag length in bytes.
    fn tag_size(&self) -> usize;

    /// Zeroize all key, keystream and MAC state.
    fn clear(&mut self);
}

/// Per-message state: keystream positioned at block 1 and the running MAC.
struct Message {
    cipher: ChaCha20,
    mac: Poly1305,
    payload_len: Option<u64>,
}

/// ChaCha20-Poly1305 with an empty associated-data field.
///
/// Byte-compatible with `chacha20poly1305::ChaCha20Poly1305` and with every
/// other RFC 8439 implementation.
#[derive(Default)]
pub struct ChaChaPoly {
    key: Option<Zeroizing<[u8; KEY_LEN]>>,
    message: Option<Message>,
}

impl ChaChaPoly {
    pub fn new() -> Self {
        Self::default()
    }

    fn message_mut(&mut self) -> Result<&mut Message, FrameError> {
        let message = self
            .message
            .as_mut()
            .ok_or(FrameError::ConfigFault("no message in progress; call set_nonce first"))?;
        if message.payload_len.is_some() {
            return Err(FrameError::ConfigFault(
                "one payload per nonce; compute the tag before reusing the primitive",
            ));
        }
        Ok(message)
    }
}

impl AeadPrimitive for ChaChaPoly {
    fn set_key(&mut self, key: &FrameKey) {
        self.message = None;
        self.key = Some(Zeroizing::new(*key.as_bytes()));
    }

    fn set_nonce(&mut self, nonce: &[u8; NONCE_LEN]) -> Result<(), FrameError> {
        let key = self
            .key
            .as_ref()
            .ok_or(FrameError::ConfigFault("no key loaded; call set_key first"))?;

        let mut cipher = ChaCha20::new(
            chacha20::Key::from_slice(&key[..]),
            chacha20::Nonce::from_slice(nonce),
        );

        // Block 0 keys the MAC; the payload starts at block 1.
        let mut mac_key = [0u8; 32];
        cipher.apply_keystream(&mut mac_key);
        let mac = Poly1305::new(poly1305::Key::from_slice(&mac_key));
        mac_key.zeroize();
        cipher.seek(64u64);

        self.message = Some(Message {
            cipher,
            mac,
            payload_len: None,
        });
        Ok(())
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), FrameError> {
        let message = self.message_mut()?;
        message.cipher.apply_keystream(buf);
        message.mac.update_padded(buf);
        message.payload_len = Some(buf.len() as u64);
        Ok(())
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), FrameError> {
        let message = self.message_mut()?;
        message.mac.update_padded(buf);
        message.cipher.apply_keystream(buf);
        message.payload_len = Some(buf.len() as u64);
        Ok(())
    }

    fn compute_tag(&mut self, out: &mut [u8]) -> Result<(), FrameError> {
        if out.len() > TAG_LEN {
            return Err(FrameError::ConfigFault("requested tag longer than Poly1305 output"));
        }
        let Message {
            mut mac,
            payload_len,
            ..
        } = self
            .message
            .take()
            .ok_or(FrameError::ConfigFault("no message in progress; call set_nonce first"))?;

        // Length block: associated-data length (always 0), then payload length.
        let mut lengths = poly1305::Block::default();
        lengths[8..].copy_from_slice(&payload_len.unwrap_or(0).to_le_bytes());
        mac.update(&[lengths]);

        let mut tag: [u8; TAG_LEN] = mac.finalize().into();
        out.copy_from_slice(&tag[..out.len()]);
        tag.zeroize();
        Ok(())
    }

    fn tag_size(&self) -> usize {
        TAG_LEN
    }

    fn clear(&mut self) {
        // Both types zeroize themselves on drop.
        self.message = None;
        self.key = None;
    }
}
