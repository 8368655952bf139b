// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the persistence layout.

use std::path::{Path, PathBuf};

/// Default base directory for persisted blobs.
pub const DATA_ROOT: &str = "./data";

/// Well-known key of the transaction ledger blob.
pub const LEDGER_KEY: &str = "cryptap_transactions";

/// Well-known key of the identifier mapping blob.
pub const IDENTIFIERS_KEY: &str = "upi_mappings";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persisted data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob stored under `key`.
    pub fn blob(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Path to the ledger blob.
    pub fn ledger(&self) -> PathBuf {
        self.blob(LEDGER_KEY)
    }

    /// Path to the identifier mapping blob.
    pub fn identifiers(&self) -> PathBuf {
        self.blob(IDENTIFIERS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_paths_live_under_root() {
        let paths = StoragePaths::new("/tmp/bridge");
        assert_eq!(
            paths.ledger(),
            PathBuf::from("/tmp/bridge/cryptap_transactions.json")
        );
        assert_eq!(
            paths.identifiers(),
            PathBuf::from("/tmp/bridge/upi_mappings.json")
        );
    }

    #[test]
    fn default_root_is_relative_data_dir() {
        assert_eq!(StoragePaths::default().root(), Path::new(DATA_ROOT));
    }
}
