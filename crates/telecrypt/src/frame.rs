//! Authenticated frame codec.
//!
//! # Frame format
//!
//! ```text
//! offset 0        12                12+N
//!        | nonce  | ciphertext (N)  | tag (16) |
//! ```
//!
//! Total length is `N + 28`; a frame shorter than 28 bytes is never valid.
//!
//! # Decryption order
//!
//! ChaCha20 decrypts by keystream XOR, so plaintext is written into the output
//! before the tag is checked. Those bytes stay unverified until the expected
//! tag has been compared with the carried one in constant time. On mismatch
//! the output region is zeroed and [`FrameError::AuthFailure`] is returned.

use std::ops::{Deref, DerefMut};

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{AeadPrimitive, ChaChaPoly, OsRandom, RandomSource};
use crate::error::FrameError;
use crate::key::FrameKey;

/// Byte length of a ChaCha20-Poly1305 nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of a Poly1305 tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Capacity of the buffer the expected tag is computed into. A primitive
/// reporting a larger tag is a configuration fault.
pub const MAX_TAG_LEN: usize = 16;

/// Bytes a frame adds on top of its plaintext.
pub const FRAME_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Length of a frame carrying an empty plaintext.
pub const MIN_FRAME_LEN: usize = FRAME_OVERHEAD;

/// Borrowed, bounds-checked view of a frame's three regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub nonce: &'a [u8; NONCE_LEN],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Split `frame` into nonce, ciphertext and a `tag_len`-byte tag.
    ///
    /// # Errors
    ///
    /// [`FrameError::ConfigFault`] if `tag_len` is 0 or above [`MAX_TAG_LEN`];
    /// [`FrameError::TooShort`] if `frame` cannot hold a nonce and a tag.
    pub fn parse(frame: &'a [u8], tag_len: usize) -> Result<Self, FrameError> {
        check_tag_len(tag_len)?;
        let min = NONCE_LEN + tag_len;
        if frame.len() < min {
            return Err(FrameError::TooShort {
                len: frame.len(),
                min,
            });
        }

        let (nonce, rest) = frame.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - tag_len);
        let nonce = nonce.try_into().map_err(|_| FrameError::TooShort {
            len: frame.len(),
            min,
        })?;

        Ok(Self {
            nonce,
            ciphertext,
            tag,
        })
    }

    /// Length of the plaintext this frame decrypts to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

fn check_tag_len(tag_len: usize) -> Result<(), FrameError> {
    if tag_len == 0 {
        return Err(FrameError::ConfigFault("primitive reports a zero-length tag"));
    }
    if tag_len > MAX_TAG_LEN {
        return Err(FrameError::ConfigFault(
            "primitive tag exceeds the comparison buffer",
        ));
    }
    Ok(())
}

/// Clears the wrapped primitive when the enclosing call returns, on every path.
struct Scrub<'a, A: AeadPrimitive>(&'a mut A);

impl<A: AeadPrimitive> Deref for Scrub<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.0
    }
}

impl<A: AeadPrimitive> DerefMut for Scrub<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        self.0
    }
}

impl<A: AeadPrimitive> Drop for Scrub<'_, A> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Encrypt `plaintext` into `out` as `nonce || ciphertext || tag`.
///
/// Returns the frame length (`plaintext.len()` plus nonce and tag). `aead` is
/// cleared before returning. On error, any bytes already written to `out` are
/// zeroed.
///
/// # Errors
///
/// [`FrameError::BufferTooSmall`] if `out` cannot hold the frame,
/// [`FrameError::Entropy`] if no nonce could be drawn,
/// [`FrameError::ConfigFault`] if the primitive misbehaves.
pub fn seal_frame<A, R>(
    aead: &mut A,
    key: &FrameKey,
    rng: &mut R,
    plaintext: &[u8],
    out: &mut [u8],
) -> Result<usize, FrameError>
where
    A: AeadPrimitive,
    R: RandomSource + ?Sized,
{
    let mut aead = Scrub(aead);
    let tag_len = aead.tag_size();
    check_tag_len(tag_len)?;

    let frame_len = plaintext
        .len()
        .checked_add(NONCE_LEN + tag_len)
        .ok_or(FrameError::BufferTooSmall {
            needed: usize::MAX,
            capacity: out.len(),
        })?;
    if out.len() < frame_len {
        return Err(FrameError::BufferTooSmall {
            needed: frame_len,
            capacity: out.len(),
        });
    }

    let frame = &mut out[..frame_len];
    let result = write_frame(&mut *aead, key, rng, plaintext, frame);
    if result.is_err() {
        frame.zeroize();
    }
    result.map(|()| frame_len)
}

fn write_frame<A, R>(
    aead: &mut A,
    key: &FrameKey,
    rng: &mut R,
    plaintext: &[u8],
    frame: &mut [u8],
) -> Result<(), FrameError>
where
    A: AeadPrimitive,
    R: RandomSource + ?Sized,
{
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_random(&mut nonce)?;

    aead.set_key(key);
    aead.set_nonce(&nonce)?;

    let (head, rest) = frame.split_at_mut(NONCE_LEN);
    let (body, tag) = rest.split_at_mut(plaintext.len());
    body.copy_from_slice(plaintext);
    aead.encrypt(body)?;
    aead.compute_tag(tag)?;
    head.copy_from_slice(&nonce);
    Ok(())
}

/// Verify and decrypt `frame` into `out`.
///
/// Returns the plaintext length. `out[..len]` is only meaningful on `Ok`; on
/// authentication failure the region is zeroed. `aead` is cleared before
/// returning.
///
/// # Errors
///
/// [`FrameError::TooShort`] before any cryptographic work if the frame cannot
/// hold a nonce and a tag, [`FrameError::AuthFailure`] on tag mismatch,
/// [`FrameError::BufferTooSmall`] if `out` cannot hold the plaintext,
/// [`FrameError::ConfigFault`] if the primitive misbehaves.
pub fn open_frame<A: AeadPrimitive>(
    aead: &mut A,
    key: &FrameKey,
    frame: &[u8],
    out: &mut [u8],
) -> Result<usize, FrameError> {
    let mut aead = Scrub(aead);
    let view = FrameView::parse(frame, aead.tag_size())?;

    let len = view.plaintext_len();
    if out.len() < len {
        return Err(FrameError::BufferTooSmall {
            needed: len,
            capacity: out.len(),
        });
    }

    let plaintext = &mut out[..len];
    match decrypt_verified(&mut *aead, key, &view, plaintext) {
        Ok(()) => Ok(len),
        Err(e) => {
            plaintext.zeroize();
            Err(e)
        }
    }
}

fn decrypt_verified<A: AeadPrimitive>(
    aead: &mut A,
    key: &FrameKey,
    view: &FrameView<'_>,
    plaintext: &mut [u8],
) -> Result<(), FrameError> {
    aead.set_key(key);
    aead.set_nonce(view.nonce)?;

    plaintext.copy_from_slice(view.ciphertext);
    aead.decrypt(plaintext)?;

    let mut computed = Zeroizing::new([0u8; MAX_TAG_LEN]);
    let expected = &mut computed[..view.tag.len()];
    aead.compute_tag(expected)?;

    if bool::from(expected.ct_eq(view.tag)) {
        Ok(())
    } else {
        Err(FrameError::AuthFailure)
    }
}

/// Frame codec bound to one key.
///
/// Each call builds a fresh [`ChaChaPoly`], so decryption needs only `&self`
/// and one codec can serve many threads. Encryption takes `&mut self` because
/// it draws from the random source.
pub struct FrameCodec<R = OsRandom> {
    key: FrameKey,
    rng: R,
}

impl FrameCodec<OsRandom> {
    /// Codec drawing nonces from the operating system CSPRNG.
    pub fn new(key: FrameKey) -> Self {
        Self::with_random(key, OsRandom::os())
    }
}

impl<R> FrameCodec<R> {
    /// Decrypt `frame` into `out`, returning the plaintext length.
    ///
    /// See [`open_frame`].
    pub fn decrypt_into(&self, frame: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
        let result = open_frame(&mut ChaChaPoly::new(), &self.key, frame, out);
        if let Err(e) = &result {
            log_rejection(frame, e);
        }
        result
    }

    /// Decrypt `frame` into a new buffer sized to its plaintext.
    pub fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>, FrameError> {
        let mut out = vec![0u8; frame.len().saturating_sub(FRAME_OVERHEAD)];
        let len = self.decrypt_into(frame, &mut out)?;
        out.truncate(len);
        Ok(out)
    }
}

impl<R: RandomSource> FrameCodec<R> {
    /// Codec drawing nonces from `rng`.
    pub fn with_random(key: FrameKey, rng: R) -> Self {
        Self { key, rng }
    }

    /// Encrypt `plaintext` into `out`, returning the frame length.
    ///
    /// See [`seal_frame`].
    pub fn encrypt_into(&mut self, plaintext: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
        let result = seal_frame(&mut ChaChaPoly::new(), &self.key, &mut self.rng, plaintext, out);
        if let Err(e) = &result {
            warn!(code = e.code(), error = %e, plaintext_len = plaintext.len(), "frame encryption failed");
        }
        result
    }

    /// Encrypt `plaintext` into a new frame.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, FrameError> {
        let mut out = vec![0u8; plaintext.len() + FRAME_OVERHEAD];
        let len = self.encrypt_into(plaintext, &mut out)?;
        out.truncate(len);
        Ok(out)
    }
}

impl<R> std::fmt::Debug for FrameCodec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn log_rejection(frame: &[u8], e: &FrameError) {
    match e {
        // Ciphertext only; safe to dump.
        FrameError::TooShort { .. } => {
            debug!(frame = %hex::encode(frame), "short frame contents");
            warn!(code = e.code(), error = %e, frame_len = frame.len(), "frame rejected");
        }
        _ => warn!(code = e.code(), error = %e, frame_len = frame.len(), "frame rejected"),
    }
}
