//! OpenDAL-backed secret store: one JSON object per record
//!
//! Layout: `<prefix>/<secret_key>.json`, holding the record in its logical
//! layout (`id`, `created_at`, `message`, `passphrase`, `secret_key`).
//!
//! Object stores have no native delete-and-return, so `insert` and `take` are
//! serialized by a store-wide async mutex. That makes `take` atomic for every
//! revealer sharing this process; two processes must not share one root.

use anyhow::{Context, Result};
use async_trait::async_trait;
use opendal::Operator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use ots_core::config::{StorageBackend, StorageConfig};
use ots_core::{OtsError, OtsResult, SecretRecord};

use crate::{is_valid_secret_key, MemoryStore, SecretStore};

pub struct OpendalStore {
    op: Operator,
    prefix: String,
    next_id: AtomicU64,
    write_lock: Mutex<()>,
}

impl OpendalStore {
    /// Open a store on `op`, continuing surrogate ids after the highest one
    /// already present under `prefix`.
    pub async fn open(op: Operator, prefix: &str) -> Result<Self> {
        let store = Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
            next_id: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        };

        let mut max_id = 0;
        let mut live = 0usize;
        let mut unreadable = 0usize;
        for path in store.list_record_paths().await? {
            match store.read_record(&path).await {
                Ok(Some(record)) => {
                    max_id = max_id.max(record.id);
                    live += 1;
                }
                Ok(None) => {}
                Err(_) => unreadable += 1,
            }
        }
        store.next_id.store(max_id, Ordering::Relaxed);

        // Record paths embed secret keys; report a count only
        if unreadable > 0 {
            tracing::warn!(unreadable, "skipped unreadable secret records");
        }

        tracing::info!(prefix = %store.prefix, live, max_id, "secret store opened");
        Ok(store)
    }

    fn record_path(&self, secret_key: &str) -> Option<String> {
        is_valid_secret_key(secret_key).then(|| format!("{}/{}.json", self.prefix, secret_key))
    }

    async fn list_record_paths(&self) -> OtsResult<Vec<String>> {
        let dir = format!("{}/", self.prefix);
        match self.op.list(&dir).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .map(|e| e.path().to_string())
                .filter(|p| p.ends_with(".json"))
                .collect()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(storage_error("listing", e)),
        }
    }

    async fn read_record(&self, path: &str) -> OtsResult<Option<SecretRecord>> {
        match self.op.read(path).await {
            Ok(data) => serde_json::from_slice(&data.to_bytes())
                .map(Some)
                .map_err(|e| OtsError::Storage(format!("parsing secret record: {e}"))),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("reading", e)),
        }
    }
}

/// Record paths embed secret keys and OpenDAL errors carry the path, so only
/// the error kind is kept.
fn storage_error(action: &str, e: opendal::Error) -> OtsError {
    OtsError::Storage(format!("{action} secret record: {}", e.kind()))
}

#[async_trait]
impl SecretStore for OpendalStore {
    async fn insert(&self, mut record: SecretRecord) -> OtsResult<u64> {
        let path = self
            .record_path(&record.secret_key)
            .ok_or_else(|| OtsError::Storage("invalid secret key".into()))?;

        let _guard = self.write_lock.lock().await;

        let exists = self
            .op
            .exists(&path)
            .await
            .map_err(|e| storage_error("checking", e))?;
        if exists {
            return Err(OtsError::Storage("secret key already in use".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        record.id = id;
        let json = serde_json::to_vec(&record)
            .map_err(|e| OtsError::Storage(format!("serializing record: {e}")))?;

        self.op
            .write(&path, json)
            .await
            .map_err(|e| storage_error("writing", e))?;
        Ok(id)
    }

    async fn fetch(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>> {
        match self.record_path(secret_key) {
            Some(path) => self.read_record(&path).await,
            None => Ok(None),
        }
    }

    async fn take(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>> {
        let Some(path) = self.record_path(secret_key) else {
            return Ok(None);
        };

        let _guard = self.write_lock.lock().await;

        let Some(record) = self.read_record(&path).await? else {
            return Ok(None);
        };
        self.op
            .delete(&path)
            .await
            .map_err(|e| storage_error("deleting", e))?;
        Ok(Some(record))
    }

    async fn len(&self) -> OtsResult<usize> {
        Ok(self.list_record_paths().await?.len())
    }
}

/// Build the configured store backend.
pub async fn build_store(cfg: &StorageConfig) -> Result<Arc<dyn SecretStore>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory secret store; secrets will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Fs => {
            let root = cfg.root.to_string_lossy();
            let builder = opendal::services::Fs::default().root(&root);
            let op = Operator::new(builder)
                .context("creating OpenDAL fs operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .layer(
                    opendal::layers::RetryLayer::new()
                        .with_max_times(3)
                        .with_jitter(),
                )
                .finish();

            let store = OpendalStore::open(op, &cfg.prefix)
                .await
                .with_context(|| format!("opening secret store at {}", cfg.root.display()))?;
            Ok(Arc::new(store))
        }
    }
}
