//! Authenticated secret tokens (XChaCha20-Poly1305)
//!
//! Token format (binary, then URL-safe base64 with padding):
//! ```text
//! [1 byte: version = 0x01][8 bytes: issued-at, unix seconds, BE]
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = version || issued-at
//! ```
//!
//! The tag covers every preceding field: the header as AAD, the nonce as the
//! AEAD nonce, and the ciphertext itself. A flipped bit anywhere, or the wrong
//! key, fails decryption with [`CryptoError::Integrity`]. The two cases are
//! indistinguishable.
//!
//! The issued-at timestamp is informational. No expiry is enforced here.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroize;

use crate::{CipherKey, CryptoError, NONCE_SIZE, TAG_SIZE};

/// Current token format version
pub const TOKEN_VERSION: u8 = 0x01;

/// version (1) + issued-at (8)
const HEADER_SIZE: usize = 1 + 8;

/// Encrypt a message into a self-contained token. Each call uses a fresh nonce.
pub fn encrypt(plaintext: &str, key: &CipherKey) -> Result<String, CryptoError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    encrypt_at(plaintext.as_bytes(), key, now)
}

fn encrypt_at(plaintext: &[u8], key: &CipherKey, issued_at: u64) -> Result<String, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let header = build_header(issued_at);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut token = Vec::with_capacity(HEADER_SIZE + NONCE_SIZE + ciphertext.len());
    token.extend_from_slice(&header);
    token.extend_from_slice(&nonce_bytes);
    token.extend_from_slice(&ciphertext);
    Ok(URL_SAFE.encode(token))
}

/// Verify and decrypt a token produced by [`encrypt`].
pub fn decrypt(token: &str, key: &CipherKey) -> Result<String, CryptoError> {
    let raw = decode(token)?;

    if raw.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
        tracing::debug!(len = raw.len(), "token too short");
        return Err(CryptoError::Integrity);
    }

    let (header, rest) = raw.split_at(HEADER_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CryptoError::Integrity)?;

    String::from_utf8(plaintext).map_err(|e| {
        e.into_bytes().zeroize();
        CryptoError::Integrity
    })
}

/// Read the issued-at timestamp of a token without authenticating it.
pub fn issued_at(token: &str) -> Result<u64, CryptoError> {
    let raw = decode(token)?;
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&raw[1..HEADER_SIZE]);
    Ok(u64::from_be_bytes(ts))
}

/// Base64 decode plus header sanity checks shared by `decrypt` and `issued_at`.
fn decode(token: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = URL_SAFE.decode(token.trim()).map_err(|e| {
        tracing::debug!("token is not url-safe base64: {e}");
        CryptoError::Integrity
    })?;

    match raw.first() {
        Some(&TOKEN_VERSION) if raw.len() >= HEADER_SIZE => Ok(raw),
        Some(&TOKEN_VERSION) => Err(CryptoError::Integrity),
        Some(other) => {
            tracing::debug!(version = other, "unknown token version");
            Err(CryptoError::Integrity)
        }
        None => Err(CryptoError::Integrity),
    }
}

fn build_header(issued_at: u64) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = TOKEN_VERSION;
    header[1..].copy_from_slice(&issued_at.to_be_bytes());
    header
}
