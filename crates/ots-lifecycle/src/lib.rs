//! ots-lifecycle: create a secret once, reveal it exactly once
//!
//! ```text
//! create:  derive key ──> encrypt ──> store.insert ──> secret_key
//! reveal:  store.fetch ──> verify passphrase ──> derive key ──> decrypt ──> store.take
//! ```
//!
//! Per secret, the state machine is `CREATED` → `DELETED`. Failed
//! authentication or a failed decrypt leave the record untouched (unless the
//! integrity policy says to purge). Only the caller whose `take` wins observes
//! the plaintext; every other caller gets `NotFound`.

pub mod context;
pub mod lifecycle;

pub use context::key_derivation_from_config;
pub use lifecycle::SecretLifecycle;
