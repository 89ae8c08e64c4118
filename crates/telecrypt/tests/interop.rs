//! Frames must be readable by any standard ChaCha20-Poly1305 implementation
//! laid out as `nonce || ciphertext || tag`, and vice versa.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use telecrypt::{FrameCodec, FrameError, FrameKey, NONCE_LEN};

const KEY_HEX: &str = "d38a3b96a26d0b1139bd30c174884f5dbc8eaaf492493725633ecebfa4ab19e9";

fn key_bytes() -> [u8; 32] {
    let mut key = [0u8; 32];
    hex::decode_to_slice(KEY_HEX, &mut key).unwrap();
    key
}

#[test]
fn reference_opens_our_frames() {
    let mut codec = FrameCodec::new(FrameKey::from_hex(KEY_HEX).unwrap());
    let message = b"Hello, Server! 1700000000.0";
    let frame = codec.encrypt(message).unwrap();

    let reference = ChaCha20Poly1305::new(Key::from_slice(&key_bytes()));
    let opened = reference
        .decrypt(Nonce::from_slice(&frame[..NONCE_LEN]), &frame[NONCE_LEN..])
        .unwrap();
    assert_eq!(opened, message);
}

#[test]
fn we_open_reference_frames() {
    let reference = ChaCha20Poly1305::new(Key::from_slice(&key_bytes()));
    let nonce = [0x5cu8; NONCE_LEN];
    let sealed = reference
        .encrypt(Nonce::from_slice(&nonce), &b"temp=19.2;rssi=-71"[..])
        .unwrap();

    let mut frame = nonce.to_vec();
    frame.extend_from_slice(&sealed);

    let codec = FrameCodec::new(FrameKey::from_hex(KEY_HEX).unwrap());
    assert_eq!(codec.decrypt(&frame).unwrap(), b"temp=19.2;rssi=-71");
}

#[test]
fn reference_frame_with_empty_plaintext() {
    let reference = ChaCha20Poly1305::new(Key::from_slice(&key_bytes()));
    let nonce = [0u8; NONCE_LEN];
    let sealed = reference
        .encrypt(Nonce::from_slice(&nonce), &b""[..])
        .unwrap();
    let mut frame = nonce.to_vec();
    frame.extend_from_slice(&sealed);
    assert_eq!(frame.len(), 28);

    let codec = FrameCodec::new(FrameKey::from_hex(KEY_HEX).unwrap());
    assert!(codec.decrypt(&frame).unwrap().is_empty());
}

#[test]
fn garbage_datagram_is_rejected() {
    let codec = FrameCodec::new(FrameKey::from_hex(KEY_HEX).unwrap());
    assert_eq!(
        codec.decrypt(b"this should fail"),
        Err(FrameError::TooShort { len: 16, min: 28 })
    );
    assert_eq!(
        codec.decrypt(b"this datagram is long enough but is not a frame"),
        Err(FrameError::AuthFailure)
    );
}
