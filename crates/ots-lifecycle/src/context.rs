//! Startup wiring: config → immutable key material

use ots_core::config::{CryptoConfig, DEFAULT_KEY_ENV};
use ots_core::{OtsError, OtsResult};
use ots_crypto::{CipherKey, KdfParams, KeyDerivation};

/// Build the process-wide key derivation context.
///
/// A missing or malformed default key is a configuration error and must stop
/// startup; it is never surfaced per request.
pub fn key_derivation_from_config(cfg: &CryptoConfig) -> OtsResult<KeyDerivation> {
    let encoded = cfg.default_key.as_deref().ok_or_else(|| {
        OtsError::Config(format!(
            "crypto.default_key is not set (set it in the config file or via {DEFAULT_KEY_ENV})"
        ))
    })?;

    let default_key = CipherKey::from_base64(encoded)
        .map_err(|e| OtsError::Config(format!("crypto.default_key: {e}")))?;

    let params = KdfParams {
        mem_cost_kib: cfg.argon2_mem_cost_kib,
        time_cost: cfg.argon2_time_cost,
        parallelism: cfg.argon2_parallelism,
    };

    KeyDerivation::new(default_key, &cfg.passphrase_salt, &params)
        .map_err(|e| OtsError::Config(format!("crypto: {e}")))
}
