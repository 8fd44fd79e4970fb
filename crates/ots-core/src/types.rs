use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The sole persisted entity: one encrypted, single-use secret.
///
/// Field names on the wire follow the logical record layout
/// (`id`, `created_at`, `message`, `passphrase`, `secret_key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Surrogate id, assigned by the store on insert
    #[serde(default)]
    pub id: u64,
    /// Unix timestamp (seconds) of creation; informational only
    pub created_at: u64,
    /// Authenticated token produced by the cipher engine
    #[serde(rename = "message")]
    pub cipher_text: String,
    /// PHC-format Argon2id hash; present iff created with a passphrase
    #[serde(rename = "passphrase")]
    pub passphrase_hash: Option<String>,
    /// Opaque external lookup handle
    pub secret_key: String,
}

impl SecretRecord {
    /// Build a record that has not been persisted yet (id 0, created now).
    pub fn new(secret_key: String, cipher_text: String, passphrase_hash: Option<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            id: 0,
            created_at,
            cipher_text,
            passphrase_hash,
            secret_key,
        }
    }

    pub fn requires_passphrase(&self) -> bool {
        self.passphrase_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_layout() {
        let record = SecretRecord {
            id: 7,
            created_at: 1_700_000_000,
            cipher_text: "token".into(),
            passphrase_hash: None,
            secret_key: "abc".into(),
        };

        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["created_at"], 1_700_000_000u64);
        assert_eq!(value["message"], "token");
        assert!(value["passphrase"].is_null());
        assert_eq!(value["secret_key"], "abc");
    }

    #[test]
    fn test_requires_passphrase() {
        let open = SecretRecord::new("k1".into(), "t".into(), None);
        let locked = SecretRecord::new("k2".into(), "t".into(), Some("$argon2id$...".into()));

        assert!(!open.requires_passphrase());
        assert!(locked.requires_passphrase());
        assert_eq!(open.id, 0);
        assert!(open.created_at > 0);
    }
}
