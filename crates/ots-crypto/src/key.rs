//! Symmetric key type and its textual (URL-safe base64) form

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::RngCore;
use zeroize::Zeroize;

use crate::{CryptoError, KEY_SIZE};

/// A 256-bit symmetric key for the cipher engine. Zeroized on drop.
#[derive(Clone)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Generate a random key (used to mint a default key).
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Parse the 44-character URL-safe base64 form.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = URL_SAFE
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("not url-safe base64: {e}")))?;

        if decoded.len() != KEY_SIZE {
            let len = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "decoded key is {len} bytes (expected {KEY_SIZE})"
            )));
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.bytes)
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
