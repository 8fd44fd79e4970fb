//! Key derivation: optional passphrase → cipher key
//!
//! Passphrases are hashed with Argon2id under one fixed, application-wide
//! salt. The PHC string of that hash is what gets stored for verification,
//! and the first [`KEY_SIZE`] bytes of the same hash output are the cipher
//! key. The key itself is never stored; it is recomputed from the passphrase
//! at reveal time.
//!
//! On reveal the key is recomputed under the parameters and salt recorded in
//! the stored PHC string, so retuning the Argon2 cost settings only affects
//! secrets created afterwards.
//!
//! Known weakness, kept on purpose: because the salt is shared, two secrets
//! created with the same passphrase get the same key.

use argon2::password_hash::{Output, PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};

use crate::{CipherKey, CryptoError, KEY_SIZE};

/// Argon2 rejects salts shorter than this many bytes
const MIN_SALT_LEN: usize = 8;

/// Argon2id parameters for passphrase hashing
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Process-wide key material: the default key, the shared salt, and the
/// configured Argon2id instance. Built once at startup, shared read-only.
pub struct KeyDerivation {
    default_key: CipherKey,
    salt: SaltString,
    argon2: Argon2<'static>,
}

impl KeyDerivation {
    /// `salt_b64` is the B64 (unpadded) application salt.
    pub fn new(
        default_key: CipherKey,
        salt_b64: &str,
        params: &KdfParams,
    ) -> Result<Self, CryptoError> {
        let salt = SaltString::from_b64(salt_b64)
            .map_err(|e| CryptoError::InvalidSalt(e.to_string()))?;

        let mut buf = [0u8; 64];
        let decoded_len = salt
            .as_salt()
            .decode_b64(&mut buf)
            .map_err(|e| CryptoError::InvalidSalt(e.to_string()))?
            .len();
        if decoded_len < MIN_SALT_LEN {
            return Err(CryptoError::InvalidSalt(format!(
                "salt is {decoded_len} bytes (minimum {MIN_SALT_LEN})"
            )));
        }

        let argon2_params = Params::new(
            params.mem_cost_kib,
            params.time_cost,
            params.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

        Ok(Self {
            default_key,
            salt,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params),
        })
    }

    pub fn default_key(&self) -> &CipherKey {
        &self.default_key
    }

    /// Derive the cipher key for a secret under the configured parameters.
    ///
    /// `None` yields the default key. The same passphrase always yields the
    /// same key.
    pub fn derive(&self, passphrase: Option<&SecretString>) -> Result<CipherKey, CryptoError> {
        match passphrase {
            Some(passphrase) => key_from_hash(&self.hash(passphrase)?),
            None => Ok(self.default_key.clone()),
        }
    }

    /// Hash a new passphrase once: the PHC string to store, and the cipher
    /// key taken from the same output.
    pub fn hash_and_derive(
        &self,
        passphrase: &SecretString,
    ) -> Result<(String, CipherKey), CryptoError> {
        let hash = self.hash(passphrase)?;
        let key = key_from_hash(&hash)?;
        Ok((hash.to_string(), key))
    }

    /// Check a passphrase against a stored PHC string and, on a match, return
    /// the cipher key from the recomputed output.
    ///
    /// The algorithm, parameters and salt come from `stored`, not from the
    /// current configuration. The comparison is constant-time. An unparseable
    /// hash never verifies.
    pub fn verify_and_derive(&self, passphrase: &SecretString, stored: &str) -> Option<CipherKey> {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("stored passphrase hash is malformed: {e}");
                return None;
            }
        };
        let (Some(salt), Some(expected)) = (parsed.salt, parsed.hash) else {
            tracing::warn!("stored passphrase hash has no salt or output");
            return None;
        };

        let recomputed = Params::try_from(&parsed).and_then(|params| {
            self.argon2.hash_password_customized(
                passphrase.expose_secret().as_bytes(),
                Some(parsed.algorithm),
                parsed.version,
                params,
                salt,
            )
        });
        let output = match recomputed {
            Ok(hash) => hash.hash?,
            Err(e) => {
                tracing::warn!("recomputing stored passphrase hash failed: {e}");
                return None;
            }
        };

        // `Output` equality is constant-time
        if output != expected {
            return None;
        }
        key_from_output(&output).ok()
    }

    fn hash(&self, passphrase: &SecretString) -> Result<PasswordHash<'_>, CryptoError> {
        self.argon2
            .hash_password(passphrase.expose_secret().as_bytes(), &self.salt)
            .map_err(|e| CryptoError::Kdf(format!("Argon2id hash failed: {e}")))
    }
}

fn key_from_hash(hash: &PasswordHash<'_>) -> Result<CipherKey, CryptoError> {
    let output = hash
        .hash
        .ok_or_else(|| CryptoError::Kdf("Argon2id produced no output".into()))?;
    key_from_output(&output)
}

/// The cipher key is the first [`KEY_SIZE`] bytes of the Argon2id output.
fn key_from_output(output: &Output) -> Result<CipherKey, CryptoError> {
    let bytes = output.as_bytes();
    if bytes.len() < KEY_SIZE {
        return Err(CryptoError::Kdf(format!(
            "Argon2id output is {} bytes (need {KEY_SIZE})",
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes[..KEY_SIZE]);
    Ok(CipherKey::from_bytes(key))
}

impl std::fmt::Debug for KeyDerivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDerivation")
            .field("default_key", &self.default_key)
            .field("salt", &self.salt.as_str())
            .finish_non_exhaustive()
    }
}
