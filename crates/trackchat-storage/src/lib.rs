//! Credential storage for the trackchat client.
//!
//! - [`SecureStorage`]: durable key-value medium (`FileStorage`, `MemoryStorage`)
//! - [`TokenStore`]: sole owner of the current [`CredentialPair`]

mod file;
mod keys;
mod memory;
mod token_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use token_store::{CredentialPair, TokenStore};
pub use traits::SecureStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_constants() {
        assert!(!StorageKeys::CREDENTIALS.is_empty());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StorageError::NotFound("credentials".to_string()).to_string(),
            "Key not found: credentials"
        );
        assert_eq!(
            StorageError::Backend("disk full".to_string()).to_string(),
            "Storage backend error: disk full"
        );
    }
}
