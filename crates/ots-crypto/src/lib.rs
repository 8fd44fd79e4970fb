//! ots-crypto: encryption for one-time secrets
//!
//! Two pieces, both pure and synchronous:
//!
//! - **Key derivation** ([`kdf`]): an optional passphrase becomes a 256-bit
//!   [`CipherKey`] through Argon2id with one application-wide salt. No
//!   passphrase means the process-wide default key.
//! - **Cipher engine** ([`token`]): XChaCha20-Poly1305 authenticated tokens.
//!
//! ```text
//! passphrase ──Argon2id(fixed salt)──┬── PHC string ──> stored for verification
//!                                    └── first 32 bytes ──> CipherKey
//! no passphrase ─────────────────────────> default CipherKey (from config)
//!
//! CipherKey + message ──XChaCha20-Poly1305──> base64url(version|ts|nonce|ct|tag)
//! ```

pub mod error;
pub mod kdf;
pub mod key;
pub mod token;

pub use error::CryptoError;
pub use kdf::{KdfParams, KeyDerivation};
pub use key::CipherKey;
pub use token::{decrypt, encrypt, issued_at};

/// Size of a cipher key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
