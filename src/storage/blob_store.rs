// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Whole-blob JSON persistence.
//!
//! Each persisted collection lives in a single JSON file under a well-known
//! key. A blob is loaded once at start-up and rewritten in full after every
//! mutation; writes go to a temp file first and are renamed into place so a
//! crash never leaves a half-written blob behind.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage not initialized
    #[error("storage not initialized")]
    NotInitialized,

    /// Blob written by an unknown schema version
    #[error("unsupported schema version {found} in {key} (expected {expected})")]
    UnsupportedVersion {
        key: String,
        found: u32,
        expected: u32,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    paths: StoragePaths,
    initialized: bool,
}

impl BlobStore {
    /// Create a new BlobStore.
    ///
    /// Does NOT create the directory. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Create and initialize a store in one step.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        let mut store = Self::new(paths);
        store.initialize()?;
        Ok(store)
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Check if storage is initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create the data directory. Safe to call multiple times.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.root())?;
        self.initialized = true;
        Ok(())
    }

    /// Write-read-delete probe of the data directory.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ensure_initialized()?;

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "health check data mismatch",
            )));
        }

        Ok(())
    }

    /// Load the blob stored under `key`, or `None` if it was never written.
    pub fn read_blob<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.ensure_initialized()?;

        let path = self.paths.blob(key);
        match File::open(&path) {
            Ok(file) => {
                let value = serde_json::from_reader(BufReader::new(file))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the blob stored under `key`.
    pub fn write_blob<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.ensure_initialized()?;
        write_json_atomic(&self.paths.blob(key), value)
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }
}

/// Write a JSON file via temp file + rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    fn test_store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(StoragePaths::new(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn write_and_read_blob() {
        let (_dir, store) = test_store();
        let data = TestData {
            id: "test-1".to_string(),
            value: 42,
        };

        store.write_blob("things", &data).unwrap();
        let read: Option<TestData> = store.read_blob("things").unwrap();
        assert_eq!(read, Some(data));
        assert!(!store.paths().blob("things").with_extension("tmp").exists());
    }

    #[test]
    fn missing_blob_reads_as_none() {
        let (_dir, store) = test_store();
        let read: Option<TestData> = store.read_blob("nothing").unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn corrupt_blob_is_a_json_error() {
        let (_dir, store) = test_store();
        fs::write(store.paths().blob("broken"), b"{not json").unwrap();
        let result = store.read_blob::<TestData>("broken");
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[test]
    fn health_check_works() {
        let (_dir, store) = test_store();
        store.health_check().expect("Health check should pass");
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let store = BlobStore::new(StoragePaths::new("/tmp/never-init"));
        let result = store.read_blob::<TestData>("any");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
