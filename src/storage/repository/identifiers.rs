// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identifier mapping persistence.
//!
//! The mapping is stored as a flat JSON object of lower-cased identifier to
//! wallet address under `{DATA_DIR}/upi_mappings.json`.

use std::collections::BTreeMap;

use super::super::paths::IDENTIFIERS_KEY;
use super::super::{BlobStore, StorageResult};

/// Repository for the identifier mapping blob.
pub struct IdentifierRepository<'a> {
    storage: &'a BlobStore,
}

impl<'a> IdentifierRepository<'a> {
    pub fn new(storage: &'a BlobStore) -> Self {
        Self { storage }
    }

    /// Load the mapping; an absent blob is an empty mapping.
    pub fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        Ok(self
            .storage
            .read_blob(IDENTIFIERS_KEY)?
            .unwrap_or_default())
    }

    /// Rewrite the mapping blob.
    pub fn save(&self, mappings: &BTreeMap<String, String>) -> StorageResult<()> {
        self.storage.write_blob(IDENTIFIERS_KEY, mappings)
    }
}
