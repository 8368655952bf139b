// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to blob storage.
//!
//! Each repository loads and saves one well-known blob through the
//! BlobStore.

pub mod identifiers;
pub mod transactions;

pub use identifiers::IdentifierRepository;
pub use transactions::{
    render_snapshot, LedgerSnapshot, TransactionRecord, TransactionRepository, TxStatus,
    LEDGER_SCHEMA_VERSION,
};
