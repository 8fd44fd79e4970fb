use thiserror::Error;

pub type OtsResult<T> = Result<T, OtsError>;

#[derive(Debug, Error)]
pub enum OtsError {
    /// No live record for the key. Covers keys that never existed and
    /// secrets that were already revealed.
    #[error("Secret not found")]
    NotFound,

    /// Passphrase required but missing, or wrong.
    #[error("Invalid passphrase")]
    InvalidPassphrase,

    /// Token failed authentication: corrupted data or wrong key.
    #[error("ciphertext failed integrity verification")]
    Integrity,

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OtsError {
    /// Message safe to hand back to an untrusted caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            OtsError::NotFound => "Secret not found",
            OtsError::InvalidPassphrase => "Invalid passphrase",
            _ => "Internal server error",
        }
    }

    /// True for failures the caller caused, as opposed to operator-facing faults.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OtsError::NotFound | OtsError::InvalidPassphrase)
    }
}
