//! ots-store: durable keyed storage for secret records
//!
//! The lifecycle only needs four primitives. The one that matters for the
//! one-time guarantee is [`SecretStore::take`]: an atomic delete-and-return,
//! so that of any number of concurrent revealers exactly one gets the record.

pub mod health;
pub mod memory;
pub mod operator;

pub use health::check_health;
pub use memory::MemoryStore;
pub use operator::{build_store, OpendalStore};

use async_trait::async_trait;
use ots_core::{OtsResult, SecretRecord};

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Persist a new record and return its assigned surrogate id.
    ///
    /// Fails if a record with the same `secret_key` is already live.
    async fn insert(&self, record: SecretRecord) -> OtsResult<u64>;

    /// Look up a live record without consuming it.
    async fn fetch(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>>;

    /// Atomically delete a record and return it.
    ///
    /// For a given key, at most one concurrent caller receives `Some`.
    async fn take(&self, secret_key: &str) -> OtsResult<Option<SecretRecord>>;

    /// Number of live records
    async fn len(&self) -> OtsResult<usize>;
}

/// Secret keys are UUIDs; anything outside this alphabet cannot name a record
/// and must never reach a storage path.
pub(crate) fn is_valid_secret_key(secret_key: &str) -> bool {
    !secret_key.is_empty()
        && secret_key.len() <= 64
        && secret_key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
