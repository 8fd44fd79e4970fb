pub mod config;
pub mod error;
pub mod types;

pub use error::{OtsError, OtsResult};
pub use types::SecretRecord;
