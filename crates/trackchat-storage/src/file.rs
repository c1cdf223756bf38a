//! File-backed storage.
//!
//! All keys live in one JSON object. Every mutation rewrites the whole file
//! through a temp file and a rename, so readers see either the old or the new
//! document, never a torn one. A file that is not valid JSON reads as an
//! encoding error and is replaced by the next write or delete.

use crate::{SecureStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use trackchat_config::Paths;
use tracing::warn;

type Document = BTreeMap<String, String>;

/// JSON file storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create storage backed by the given file. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage at the client's credentials file.
    pub fn for_paths(paths: &Paths) -> Self {
        Self::new(paths.credentials_file())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StorageResult<Document> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StorageError::Encoding(format!("{} is not valid JSON: {}", self.path.display(), e))
        })
    }

    /// Read the document for a read-modify-write cycle.
    ///
    /// Returns `true` alongside an empty document when the file was unreadable.
    fn read_for_update(&self) -> StorageResult<(Document, bool)> {
        match self.read_document() {
            Ok(document) => Ok((document, false)),
            Err(StorageError::Encoding(e)) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Replacing unreadable storage file"
                );
                Ok((Document::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_document(&self, document: &Document) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_vec_pretty(document)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let tmp_path = self.tmp_path();

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let (mut document, _) = self.read_for_update()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_document()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        let (mut document, reset) = self.read_for_update()?;
        if document.remove(key).is_none() {
            if reset {
                self.write_document(&document)?;
            }
            return Ok(false);
        }
        self.write_document(&document)?;
        Ok(true)
    }
}
