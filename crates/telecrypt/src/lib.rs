//! Authenticated ChaCha20-Poly1305 framing for telemetry payloads.
//!
//! A frame is `nonce (12) || ciphertext (N) || tag (16)`. The sender draws a
//! fresh random nonce per frame; the receiver verifies the tag in constant
//! time before releasing any plaintext.
//!
//! ```no_run
//! use telecrypt::{FrameCodec, FrameKey};
//!
//! let key: FrameKey = "00".repeat(32).parse().unwrap();
//! let mut codec = FrameCodec::new(key);
//! let frame = codec.encrypt(b"PING").unwrap();
//! assert_eq!(codec.decrypt(&frame).unwrap(), b"PING");
//! ```

pub mod crypto;
pub mod error;
pub mod frame;
pub mod key;

pub use error::{FrameError, KeyError};
pub use frame::{
    open_frame, seal_frame, FrameCodec, FrameView, FRAME_OVERHEAD, MIN_FRAME_LEN, NONCE_LEN,
    TAG_LEN,
};
pub use key::{parse_hex_key, FrameKey, KEY_HEX_LEN, KEY_LEN};
