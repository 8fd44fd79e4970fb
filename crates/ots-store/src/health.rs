//! Store health check

use ots_core::OtsResult;

use crate::SecretStore;

/// Verify the store answers. Counting live records is the lightest probe
/// every backend supports.
pub async fn check_health(store: &dyn SecretStore) -> OtsResult<()> {
    store.len().await.map(|_| ())
}

/// Returns true if the store is reachable, false otherwise (non-panicking)
pub async fn is_healthy(store: &dyn SecretStore) -> bool {
    check_health(store).await.is_ok()
}
