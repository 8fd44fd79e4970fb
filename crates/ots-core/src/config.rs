use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides `crypto.default_key`
pub const DEFAULT_KEY_ENV: &str = "OTS_DEFAULT_KEY";

/// Fixed, non-secret, application-wide salt for passphrase hashing (B64, no padding).
///
/// Every passphrase is hashed with this same salt, so two secrets created with
/// the same passphrase derive the same key.
pub const DEFAULT_PASSPHRASE_SALT: &str = "b3RzLWZpeGVkLXNhbHQ";

/// Top-level daemon configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OtsConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
    pub lifecycle: LifecycleConfig,
}

impl OtsConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(DEFAULT_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.crypto.default_key = Some(key.trim().to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP API listen address (default: 0.0.0.0:8000)
    pub listen: String,
    /// Prometheus metrics endpoint (default: 127.0.0.1:9100)
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map; secrets vanish on restart
    Memory,
    /// One JSON object per secret under `root`
    Fs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Key prefix for secret objects
    pub prefix: String,
}

/// Cipher and key-derivation settings. Immutable once the daemon has started.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// URL-safe base64 encoded 32-byte default key
    #[serde(skip_serializing)]
    pub default_key: Option<String>,
    /// Application-wide Argon2 salt (B64, no padding)
    pub passphrase_salt: String,
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field(
                "default_key",
                &self.default_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("passphrase_salt", &self.passphrase_salt)
            .field("argon2_mem_cost_kib", &self.argon2_mem_cost_kib)
            .field("argon2_time_cost", &self.argon2_time_cost)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .finish()
    }
}

/// What to do with a record whose ciphertext fails authentication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Leave the record in place for diagnosis
    #[default]
    Keep,
    /// Delete the record so a corrupted ciphertext cannot be probed repeatedly
    Purge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub on_integrity_failure: IntegrityPolicy,
    /// Upper bound on Argon2id jobs running at once (default: 4)
    pub max_concurrent_kdf: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            on_integrity_failure: IntegrityPolicy::Keep,
            max_concurrent_kdf: 4,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".into(),
            metrics_addr: Some("127.0.0.1:9100".into()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            root: PathBuf::from("/var/lib/ots"),
            prefix: "secrets".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            default_key: None,
            passphrase_salt: DEFAULT_PASSPHRASE_SALT.into(),
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}
