use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authentication of a token failed. Tampering and a wrong key are
    /// deliberately reported the same way.
    #[error("token failed integrity verification")]
    Integrity,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid passphrase salt: {0}")]
    InvalidSalt(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),
}
