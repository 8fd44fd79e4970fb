//! Process-local secret store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use ots_core::{OtsError, OtsResult, SecretRecord};

use crate::SecretStore;

/// In-memory store. Secrets do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, SecretRecord>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn insert(&self, mut record: SecretRecord) -> OtsResult<u64> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.secret_key) {
            return Err(OtsError::Storage("secret key already in use".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        record.id = id;
        records.insert(record.secret_key.clone(), record);
        Ok(id)
    }

    async fn fetch(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>> {
        Ok(self.records.read().await.get(secret_key).cloned())
    }

    async fn take(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>> {
        Ok(self.records.write().await.remove(secret_key))
    }

    async fn len(&self) -> OtsResult<usize> {
        Ok(self.records.read().await.len())
    }
}
