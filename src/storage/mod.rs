// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for the bridge's two durable collections, the transaction
//! ledger and the identifier mapping.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   cryptap_transactions.json   # Ledger blob (versioned, newest first)
//!   upi_mappings.json           # Identifier -> address mapping
//! ```
//!
//! Both blobs are loaded at start-up and rewritten in full after every
//! mutation. This is sized for a single-user ledger of hundreds to low
//! thousands of records.

pub mod blob_store;
pub mod paths;
pub mod repository;

pub use blob_store::{BlobStore, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    IdentifierRepository, LedgerSnapshot, TransactionRecord, TransactionRepository, TxStatus,
};
