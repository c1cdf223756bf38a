//! Credential pair ownership and persistence.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use crate::memory::MemoryStorage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Access and refresh credentials. Both values are opaque.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    access: String,
    refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// The short-lived credential attached to protected calls.
    pub fn access(&self) -> &str {
        &self.access
    }

    /// The long-lived credential sent only to the refresh endpoint.
    pub fn refresh(&self) -> &str {
        &self.refresh
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// Single owner of the current credential pair.
///
/// The pair is cached in memory and mirrored to a [`SecureStorage`] under one
/// key, so a write either lands completely or not at all.
pub struct TokenStore {
    storage: Box<dyn SecureStorage>,
    current: RwLock<Option<CredentialPair>>,
}

impl TokenStore {
    /// Open a store, restoring any pair persisted by a previous process.
    ///
    /// Persisted data that cannot be read or decoded is deleted (best-effort)
    /// and treated as absent. An empty value is the marker left by a
    /// [`clear`](Self::clear) whose delete failed.
    pub fn open(storage: Box<dyn SecureStorage>) -> StorageResult<Self> {
        let raw = match storage.get(StorageKeys::CREDENTIALS) {
            Ok(raw) => raw,
            Err(StorageError::Encoding(e)) => {
                warn!(error = %e, "Discarding unreadable credential storage");
                discard(storage.as_ref());
                None
            }
            Err(e) => return Err(e),
        };

        let restored = match raw {
            Some(raw) if raw.is_empty() => {
                debug!("Persisted credentials were cleared");
                discard(storage.as_ref());
                None
            }
            Some(raw) => match serde_json::from_str::<CredentialPair>(&raw) {
                Ok(pair) => {
                    debug!("Restored persisted credentials");
                    Some(pair)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted credentials");
                    discard(storage.as_ref());
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            storage,
            current: RwLock::new(restored),
        })
    }

    /// A store with no durability.
    pub fn in_memory() -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            current: RwLock::new(None),
        }
    }

    /// Replace the stored pair. The in-memory copy only changes if persisting succeeds.
    pub fn set(&self, pair: CredentialPair) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(&pair).map_err(|e| StorageError::Encoding(e.to_string()))?;

        let mut current = self.current.write();
        self.storage.set(StorageKeys::CREDENTIALS, &encoded)?;
        *current = Some(pair);
        Ok(())
    }

    /// Current pair, or `None` if never set or cleared.
    pub fn get(&self) -> Option<CredentialPair> {
        self.current.read().clone()
    }

    /// Current access credential.
    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.access.clone())
    }

    /// Current refresh credential.
    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.refresh.clone())
    }

    /// Install a refreshed access credential, and a rotated refresh credential if given.
    ///
    /// Fails with [`StorageError::NotFound`] if the pair was cleared in the
    /// meantime, so a late refresh cannot resurrect an ended session.
    pub fn apply_refresh(
        &self,
        access: String,
        rotated_refresh: Option<String>,
    ) -> StorageResult<CredentialPair> {
        let mut current = self.current.write();
        let existing = current
            .as_ref()
            .ok_or_else(|| StorageError::NotFound(StorageKeys::CREDENTIALS.to_string()))?;

        let pair = CredentialPair {
            access,
            refresh: rotated_refresh.unwrap_or_else(|| existing.refresh.clone()),
        };
        let encoded =
            serde_json::to_string(&pair).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::CREDENTIALS, &encoded)?;
        *current = Some(pair.clone());
        Ok(pair)
    }

    /// Remove both credentials and the persisted copy.
    ///
    /// The in-memory pair is dropped first. If deleting the persisted copy
    /// fails it is overwritten with an empty value, which [`open`](Self::open)
    /// reads as absent. Only when both fail is the delete error returned.
    pub fn clear(&self) -> StorageResult<()> {
        let mut current = self.current.write();
        *current = None;

        if let Err(e) = self.storage.delete(StorageKeys::CREDENTIALS) {
            warn!(error = %e, "Deleting persisted credentials failed, blanking them");
            self.storage.set(StorageKeys::CREDENTIALS, "").map_err(|_| e)?;
        }
        Ok(())
    }

    /// Whether a pair is present.
    pub fn is_present(&self) -> bool {
        self.current.read().is_some()
    }
}

fn discard(storage: &dyn SecureStorage) {
    if let Err(e) = storage.delete(StorageKeys::CREDENTIALS) {
        warn!(error = %e, "Failed to delete unreadable persisted credentials");
    }
}
