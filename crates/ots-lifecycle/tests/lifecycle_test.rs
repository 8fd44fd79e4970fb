//! Integration tests: create → reveal through the public lifecycle API
//!
//! Covers the reveal-exactly-once contract, passphrase handling, and tamper
//! detection, against both the in-memory store and the fs-backed store.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use secrecy::SecretString;
use std::sync::Arc;

use ots_core::config::{IntegrityPolicy, OtsConfig, StorageBackend, StorageConfig};
use ots_core::OtsError;
use ots_crypto::{CipherKey, KdfParams, KeyDerivation};
use ots_lifecycle::SecretLifecycle;
use ots_store::{build_store, MemoryStore, SecretStore};
use tempfile::TempDir;

const SALT: &str = "b3RzLWZpeGVkLXNhbHQ";

fn fast_kdf() -> Arc<KeyDerivation> {
    Arc::new(
        KeyDerivation::new(
            CipherKey::from_bytes([11u8; 32]),
            SALT,
            &KdfParams {
                mem_cost_kib: 1024,
                time_cost: 1,
                parallelism: 1,
            },
        )
        .unwrap(),
    )
}

fn memory_lifecycle() -> (SecretLifecycle, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (
        SecretLifecycle::new(fast_kdf(), store.clone(), IntegrityPolicy::Keep),
        store,
    )
}

fn pw(s: &str) -> Option<SecretString> {
    Some(SecretString::from(s))
}

#[tokio::test]
async fn reveal_once_without_passphrase() {
    let (lc, _) = memory_lifecycle();

    let k1 = lc.create("hello world", None).await.unwrap();
    assert_eq!(lc.reveal(&k1, None).await.unwrap(), "hello world");
    assert!(matches!(lc.reveal(&k1, None).await, Err(OtsError::NotFound)));
}

#[tokio::test]
async fn reveal_once_with_passphrase() {
    let (lc, _) = memory_lifecycle();

    let k2 = lc.create("secret", pw("pw123")).await.unwrap();
    assert!(matches!(
        lc.reveal(&k2, pw("wrong")).await,
        Err(OtsError::InvalidPassphrase)
    ));
    assert_eq!(lc.reveal(&k2, pw("pw123")).await.unwrap(), "secret");
    assert!(matches!(
        lc.reveal(&k2, pw("pw123")).await,
        Err(OtsError::NotFound)
    ));
}

#[tokio::test]
async fn wrong_passphrase_never_consumes() {
    let (lc, store) = memory_lifecycle();
    let key = lc.create("keep me", pw("right")).await.unwrap();

    for attempt in ["wrong", "Right", "right ", "rightt"] {
        assert!(matches!(
            lc.reveal(&key, pw(attempt)).await,
            Err(OtsError::InvalidPassphrase)
        ));
    }
    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(lc.reveal(&key, pw("right")).await.unwrap(), "keep me");
}

#[tokio::test]
async fn unprotected_secret_ignores_passphrase() {
    let (lc, _) = memory_lifecycle();
    let key = lc.create("open", None).await.unwrap();

    assert_eq!(lc.reveal(&key, pw("anything")).await.unwrap(), "open");
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let (lc, _) = memory_lifecycle();
    assert!(matches!(
        lc.reveal("00000000-0000-4000-8000-000000000000", None).await,
        Err(OtsError::NotFound)
    ));
    assert!(matches!(
        lc.reveal("../../etc/passwd", None).await,
        Err(OtsError::NotFound)
    ));
}

#[tokio::test]
async fn roundtrip_unicode_and_empty_messages() {
    let (lc, _) = memory_lifecycle();

    for message in ["", "ünïcödé ✓ 秘密", "line one\nline two\ttabbed"] {
        let key = lc.create(message, None).await.unwrap();
        assert_eq!(lc.reveal(&key, None).await.unwrap(), message);

        let key = lc.create(message, pw("p")).await.unwrap();
        assert_eq!(lc.reveal(&key, pw("p")).await.unwrap(), message);
    }
}

#[tokio::test]
async fn same_passphrase_shares_hash_across_secrets() {
    // Fixed application-wide salt: identical passphrases hash identically.
    let (lc, store) = memory_lifecycle();
    let a = lc.create("a", pw("shared")).await.unwrap();
    let b = lc.create("b", pw("shared")).await.unwrap();

    let ha = store.fetch(&a).await.unwrap().unwrap().passphrase_hash;
    let hb = store.fetch(&b).await.unwrap().unwrap().passphrase_hash;
    assert_eq!(ha, hb);
    assert_ne!(a, b);
}

#[tokio::test]
async fn flipped_ciphertext_byte_is_integrity_error() {
    let (lc, store) = memory_lifecycle();
    let key = lc.create("do not corrupt me", pw("pw")).await.unwrap();

    let mut record = store.take(&key).await.unwrap().unwrap();
    let mut raw = URL_SAFE.decode(&record.cipher_text).unwrap();
    let mid = raw.len() / 2;
    raw[mid] ^= 0x20;
    record.cipher_text = URL_SAFE.encode(&raw);
    store.insert(record).await.unwrap();

    assert!(matches!(
        lc.reveal(&key, pw("pw")).await,
        Err(OtsError::Integrity)
    ));
    // Keep policy: the record is still there for diagnosis
    assert!(store.fetch(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn secret_under_rotated_default_key_is_integrity_error() {
    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    let before = SecretLifecycle::new(fast_kdf(), store.clone(), IntegrityPolicy::Keep);
    let key = before.create("m", None).await.unwrap();

    let rotated = KeyDerivation::new(
        CipherKey::from_bytes([12u8; 32]),
        SALT,
        &KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        },
    )
    .unwrap();
    let after = SecretLifecycle::new(Arc::new(rotated), store.clone(), IntegrityPolicy::Keep);

    assert!(matches!(after.reveal(&key, None).await, Err(OtsError::Integrity)));
    assert_eq!(before.reveal(&key, None).await.unwrap(), "m");
}

#[tokio::test]
async fn retuned_argon2_params_still_reveal_older_secrets() {
    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    let before = SecretLifecycle::new(fast_kdf(), store.clone(), IntegrityPolicy::Keep);
    let key = before.create("older secret", pw("pw")).await.unwrap();

    let retuned = KeyDerivation::new(
        CipherKey::from_bytes([11u8; 32]),
        SALT,
        &KdfParams {
            mem_cost_kib: 2048,
            time_cost: 2,
            parallelism: 1,
        },
    )
    .unwrap();
    let after = SecretLifecycle::new(Arc::new(retuned), store.clone(), IntegrityPolicy::Purge);

    assert!(matches!(
        after.reveal(&key, pw("wrong")).await,
        Err(OtsError::InvalidPassphrase)
    ));
    assert_eq!(after.reveal(&key, pw("pw")).await.unwrap(), "older secret");
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn from_config_with_fs_store() {
    let tmp = TempDir::new().unwrap();
    let mut config = OtsConfig::default();
    config.crypto.default_key = Some(CipherKey::generate().to_base64());
    config.crypto.argon2_mem_cost_kib = 1024;
    config.crypto.argon2_time_cost = 1;
    config.crypto.argon2_parallelism = 1;
    config.storage = StorageConfig {
        backend: StorageBackend::Fs,
        root: tmp.path().to_path_buf(),
        prefix: "secrets".into(),
    };

    let store = build_store(&config.storage).await.unwrap();
    let lc = SecretLifecycle::from_config(&config, store).unwrap();

    let key = lc.create("durable", pw("pw")).await.unwrap();
    assert!(tmp.path().join(format!("secrets/{key}.json")).exists());
    assert_eq!(lc.reveal(&key, pw("pw")).await.unwrap(), "durable");
    assert!(!tmp.path().join(format!("secrets/{key}.json")).exists());
}

#[tokio::test]
async fn from_config_without_default_key_fails() {
    let config = OtsConfig::default();
    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    assert!(matches!(
        SecretLifecycle::from_config(&config, store),
        Err(OtsError::Config(_))
    ));
}

#[tokio::test]
async fn from_config_rejects_zero_kdf_limit() {
    let mut config = OtsConfig::default();
    config.crypto.default_key = Some(CipherKey::generate().to_base64());
    config.lifecycle.max_concurrent_kdf = 0;

    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    assert!(matches!(
        SecretLifecycle::from_config(&config, store),
        Err(OtsError::Config(_))
    ));
}
