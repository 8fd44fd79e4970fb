use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ots_core::config::{IntegrityPolicy, OtsConfig};
use ots_core::{OtsError, OtsResult, SecretRecord};
use ots_crypto::{CipherKey, CryptoError, KeyDerivation};
use ots_store::SecretStore;

use crate::context::key_derivation_from_config;

/// Argon2id jobs allowed to run at once unless configured otherwise
pub const DEFAULT_MAX_CONCURRENT_KDF: usize = 4;

/// Orchestrates secret creation and one-time reveal.
///
/// Cheap to share behind an `Arc`; holds no per-request state. Neither the
/// message, the passphrase, nor the secret key is ever persisted in plaintext
/// or logged. Log lines identify records by their surrogate id.
pub struct SecretLifecycle {
    kdf: Arc<KeyDerivation>,
    store: Arc<dyn SecretStore>,
    integrity_policy: IntegrityPolicy,
    kdf_permits: Arc<Semaphore>,
}

impl SecretLifecycle {
    pub fn new(
        kdf: Arc<KeyDerivation>,
        store: Arc<dyn SecretStore>,
        integrity_policy: IntegrityPolicy,
    ) -> Self {
        Self {
            kdf,
            store,
            integrity_policy,
            kdf_permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_KDF)),
        }
    }

    /// Cap the number of concurrent Argon2id jobs. Each one holds the
    /// configured memory cost for its whole run.
    pub fn with_kdf_limit(mut self, permits: usize) -> Self {
        self.kdf_permits = Arc::new(Semaphore::new(permits.max(1)));
        self
    }

    /// Build from daemon config. Fails on a missing or malformed default key.
    pub fn from_config(config: &OtsConfig, store: Arc<dyn SecretStore>) -> OtsResult<Self> {
        if config.lifecycle.max_concurrent_kdf == 0 {
            return Err(OtsError::Config(
                "lifecycle.max_concurrent_kdf must be at least 1".into(),
            ));
        }
        let kdf = key_derivation_from_config(&config.crypto)?;
        Ok(Self::new(
            Arc::new(kdf),
            store,
            config.lifecycle.on_integrity_failure,
        )
        .with_kdf_limit(config.lifecycle.max_concurrent_kdf))
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Encrypt and persist a message; returns the retrieval token.
    pub async fn create(
        &self,
        message: &str,
        passphrase: Option<SecretString>,
    ) -> OtsResult<String> {
        let secret_key = Uuid::new_v4().to_string();

        let (key, passphrase_hash) = match normalize(passphrase) {
            Some(passphrase) => {
                let kdf = Arc::clone(&self.kdf);
                self.run_kdf(move || {
                    let (hash, key) = kdf.hash_and_derive(&passphrase).map_err(crypto_error)?;
                    Ok((key, Some(hash)))
                })
                .await?
            }
            None => (self.kdf.derive(None).map_err(crypto_error)?, None),
        };

        let cipher_text = ots_crypto::encrypt(message, &key).map_err(crypto_error)?;
        let record = SecretRecord::new(secret_key.clone(), cipher_text, passphrase_hash);
        let protected = record.requires_passphrase();

        let id = self.store.insert(record).await?;
        info!(id, protected, "secret created");
        Ok(secret_key)
    }

    /// Decrypt a secret and destroy it.
    ///
    /// Unknown and already-revealed keys both yield `NotFound`. A protected
    /// secret with a missing or wrong passphrase yields `InvalidPassphrase`
    /// without attempting decryption and without consuming the record. For an
    /// unprotected secret any supplied passphrase is ignored.
    pub async fn reveal(
        &self,
        secret_key: &str,
        passphrase: Option<SecretString>,
    ) -> OtsResult<String> {
        let Some(record) = self.store.fetch(secret_key).await? else {
            debug!("reveal: no live record");
            return Err(OtsError::NotFound);
        };

        let key = self.key_for(&record, normalize(passphrase)).await?;

        let message = match ots_crypto::decrypt(&record.cipher_text, &key) {
            Ok(message) => message,
            Err(e) => return Err(self.decrypt_failed(&record, e).await),
        };

        // Consume only after a verified decrypt. `take` is the serialization
        // point: of all concurrent revealers, one gets the record back.
        match self.store.take(secret_key).await? {
            Some(_) => {
                info!(id = record.id, "secret revealed and destroyed");
                Ok(message)
            }
            None => {
                info!(id = record.id, "reveal lost to a concurrent reveal");
                Err(OtsError::NotFound)
            }
        }
    }

    async fn key_for(
        &self,
        record: &SecretRecord,
        passphrase: Option<SecretString>,
    ) -> OtsResult<CipherKey> {
        let Some(stored) = record.passphrase_hash.clone() else {
            return self.kdf.derive(None).map_err(crypto_error);
        };

        let Some(passphrase) = passphrase else {
            info!(id = record.id, "reveal rejected: passphrase missing");
            return Err(OtsError::InvalidPassphrase);
        };

        // One Argon2id run under the stored parameters both authenticates
        // and yields the key the secret was encrypted with.
        let kdf = Arc::clone(&self.kdf);
        let result = self
            .run_kdf(move || {
                kdf.verify_and_derive(&passphrase, &stored)
                    .ok_or(OtsError::InvalidPassphrase)
            })
            .await;

        if let Err(OtsError::InvalidPassphrase) = &result {
            info!(id = record.id, "reveal rejected: passphrase mismatch");
        }
        result
    }

    async fn decrypt_failed(&self, record: &SecretRecord, e: CryptoError) -> OtsError {
        error!(
            id = record.id,
            policy = ?self.integrity_policy,
            "stored ciphertext failed verification: {e}"
        );

        if self.integrity_policy == IntegrityPolicy::Purge {
            match self.store.take(&record.secret_key).await {
                Ok(Some(_)) => warn!(id = record.id, "corrupted secret purged"),
                Ok(None) => {}
                Err(purge_err) => {
                    error!(id = record.id, "purging corrupted secret failed: {purge_err}")
                }
            }
        }

        crypto_error(e)
    }

    /// Argon2 is deliberately slow and memory-hungry; run it off the async
    /// workers, at most `kdf_permits` at a time.
    async fn run_kdf<T, F>(&self, f: F) -> OtsResult<T>
    where
        F: FnOnce() -> OtsResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.kdf_permits)
            .acquire_owned()
            .await
            .map_err(|e| OtsError::Other(anyhow::anyhow!("key derivation limiter closed: {e}")))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| OtsError::Other(anyhow::anyhow!("key derivation task failed: {e}")))?
    }
}

/// An empty passphrase means no passphrase.
fn normalize(passphrase: Option<SecretString>) -> Option<SecretString> {
    passphrase.filter(|p| !p.expose_secret().is_empty())
}

fn crypto_error(e: CryptoError) -> OtsError {
    match e {
        CryptoError::Integrity => OtsError::Integrity,
        other => OtsError::Other(other.into()),
    }
}
