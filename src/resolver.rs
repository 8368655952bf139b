// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identifier Resolver
//!
//! Maps human-readable payment handles (`shop@phonepe`) to wallet addresses.
//!
//! Lookups read an immutable snapshot of the table. Writes build a new
//! snapshot, persist it, and only then swap it in, so readers never see a
//! partially applied change and a failed write leaves the table unchanged.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use crate::blockchain::validate_address;
use crate::error::{BridgeError, BridgeResult};
use crate::storage::{BlobStore, IdentifierRepository};

/// Identifier to address table.
pub type Mappings = BTreeMap<String, String>;

/// Case-insensitive identifier to wallet address resolver.
pub struct IdentifierResolver {
    snapshot: RwLock<Arc<Mappings>>,
    /// Serializes writers so two concurrent inserts cannot lose each other.
    write_lock: Mutex<()>,
    storage: Option<BlobStore>,
}

/// Canonical key form of an identifier.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

impl IdentifierResolver {
    /// In-memory resolver with no persistence.
    pub fn in_memory() -> Self {
        Self::from_parts(Mappings::new(), None)
    }

    /// Load the persisted mapping from `storage`.
    pub fn load(storage: BlobStore) -> BridgeResult<Self> {
        let stored = IdentifierRepository::new(&storage).load()?;

        // Normalize keys and drop entries that no longer validate.
        let mut mappings = Mappings::new();
        for (identifier, address) in stored {
            match validate_address(&address) {
                Ok(_) => {
                    mappings.insert(normalize_identifier(&identifier), address);
                }
                Err(e) => {
                    tracing::warn!(%identifier, %address, error = %e, "Skipping invalid stored mapping");
                }
            }
        }

        info!(count = mappings.len(), "Loaded identifier mappings");
        Ok(Self::from_parts(mappings, Some(storage)))
    }

    fn from_parts(mappings: Mappings, storage: Option<BlobStore>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(mappings)),
            write_lock: Mutex::new(()),
            storage,
        }
    }

    fn current(&self) -> Arc<Mappings> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve an identifier to its wallet address.
    pub fn resolve(&self, identifier: &str) -> Option<String> {
        self.current().get(&normalize_identifier(identifier)).cloned()
    }

    /// Insert or overwrite a mapping.
    ///
    /// Fails with `InvalidAddress` (leaving the table unchanged) if the
    /// address does not pass format/checksum validation.
    pub fn add_mapping(&self, identifier: &str, address: &str) -> BridgeResult<()> {
        validate_address(address).map_err(|e| BridgeError::invalid_address(address, e))?;

        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Err(BridgeError::InvalidRequest(
                "identifier must not be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = Mappings::clone(&self.current());
        next.insert(key.clone(), address.to_string());

        if let Some(storage) = &self.storage {
            IdentifierRepository::new(storage).save(&next)?;
        }

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        info!(identifier = %key, %address, "Identifier mapping saved");
        Ok(())
    }

    /// Independent copy of the full mapping.
    pub fn all_mappings(&self) -> Mappings {
        Mappings::clone(&self.current())
    }

    /// Number of mapped identifiers.
    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }
}
