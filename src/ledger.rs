// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Ledger
//!
//! Ordered record of every submitted transfer, most recent first.
//!
//! All writers (the pay flow appending, the confirmation poller updating)
//! go through one write lock, and the blob is rewritten while that lock is
//! held, so the on-disk order always matches memory. A failed write rolls
//! the in-memory change back. Readers always get copies.

use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use alloy::primitives::U256;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::blockchain::{format_amount, parse_amount, validate_address, FIAT_DECIMALS, NATIVE_DECIMALS};
use crate::error::{BridgeError, BridgeResult};
use crate::storage::repository::render_snapshot;
use crate::storage::{BlobStore, TransactionRecord, TransactionRepository, TxStatus};

/// Fields supplied by the caller when recording a submission.
///
/// Every record starts out `pending`; only `update` moves it on.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount_crypto: String,
    pub amount_fiat: String,
    pub token_symbol: String,
    pub identifier: Option<String>,
    pub note: Option<String>,
    pub explorer_url: Option<String>,
}

/// Partial update merged into an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub status: Option<TxStatus>,
    pub gas_used: Option<u64>,
    pub block_number: Option<u64>,
    pub note: Option<String>,
}

impl TransactionUpdate {
    pub fn confirmed(gas_used: u64, block_number: u64) -> Self {
        Self {
            status: Some(TxStatus::Confirmed),
            gas_used: Some(gas_used),
            block_number: Some(block_number),
            note: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(TxStatus::Failed),
            ..Self::default()
        }
    }
}

/// Aggregate view of the ledger.
///
/// Amount totals cover confirmed records only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerStatistics {
    pub total: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub failed: usize,
    /// Sum of confirmed INR amounts
    pub total_amount_fiat: String,
    /// Sum of confirmed token amounts
    pub total_amount_crypto: String,
}

/// Ledger of transaction records.
pub struct TransactionLedger {
    records: RwLock<Vec<TransactionRecord>>,
    storage: Option<BlobStore>,
}

impl TransactionLedger {
    /// Ledger that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            storage: None,
        }
    }

    /// Load the persisted ledger. An unreadable blob is an error.
    pub fn load(storage: BlobStore) -> BridgeResult<Self> {
        let records = TransactionRepository::new(&storage).load()?;
        info!(count = records.len(), "Loaded transaction ledger");
        Ok(Self {
            records: RwLock::new(records),
            storage: Some(storage),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<TransactionRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TransactionRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &[TransactionRecord]) -> BridgeResult<()> {
        if let Some(storage) = &self.storage {
            TransactionRepository::new(storage).save(records)?;
        }
        Ok(())
    }

    /// Record a submission at the head of the ledger.
    pub fn append(&self, tx: NewTransaction) -> BridgeResult<TransactionRecord> {
        let crypto = parse_amount(&tx.amount_crypto, NATIVE_DECIMALS)
            .map_err(|e| BridgeError::invalid_amount("amount_crypto", e))?;
        if crypto.is_zero() {
            return Err(BridgeError::InvalidRequest(
                "amount_crypto must be greater than zero".to_string(),
            ));
        }
        parse_amount(&tx.amount_fiat, FIAT_DECIMALS)
            .map_err(|e| BridgeError::invalid_amount("amount_fiat", e))?;
        validate_address(&tx.to_address)
            .map_err(|e| BridgeError::invalid_address(&tx.to_address, e))?;

        let now = Utc::now();
        let record = TransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            hash: tx.hash,
            from_address: tx.from_address,
            to_address: tx.to_address,
            amount_crypto: tx.amount_crypto.trim().to_string(),
            amount_fiat: tx.amount_fiat.trim().to_string(),
            token_symbol: tx.token_symbol,
            identifier: tx.identifier,
            note: tx.note,
            created_at: now,
            updated_at: now,
            status: TxStatus::Pending,
            gas_used: None,
            block_number: None,
            explorer_url: tx.explorer_url,
        };

        let mut records = self.write();
        records.insert(0, record.clone());
        if let Err(e) = self.persist(&records) {
            records.remove(0);
            warn!(record_id = %record.id, error = %e, "Failed to persist ledger append");
            return Err(e);
        }

        info!(
            record_id = %record.id,
            tx_hash = %record.hash,
            status = %record.status,
            "Transaction recorded"
        );
        Ok(record)
    }

    /// Merge `patch` into record `id`.
    ///
    /// Unknown ids fail with `NotFound` and leave the ledger untouched.
    /// Status only moves `pending -> confirmed | failed`.
    pub fn update(&self, id: &str, patch: TransactionUpdate) -> BridgeResult<TransactionRecord> {
        let mut records = self.write();
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;

        let previous = records[index].clone();
        if let Some(next) = patch.status {
            let reentry = next == previous.status && previous.status.is_terminal();
            let illegal = next != previous.status && !previous.status.can_transition_to(next);
            if reentry || illegal {
                return Err(BridgeError::InvalidTransition {
                    id: id.to_string(),
                    from: previous.status.as_str(),
                    to: next.as_str(),
                });
            }
        }

        let record = &mut records[index];
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(gas_used) = patch.gas_used {
            record.gas_used = Some(gas_used);
        }
        if let Some(block_number) = patch.block_number {
            record.block_number = Some(block_number);
        }
        if let Some(note) = patch.note {
            record.note = Some(note);
        }
        record.updated_at = Utc::now();
        let updated = record.clone();

        if let Err(e) = self.persist(&records) {
            records[index] = previous;
            warn!(record_id = %id, error = %e, "Failed to persist ledger update");
            return Err(e);
        }

        info!(
            record_id = %id,
            from = %previous.status,
            to = %updated.status,
            gas_used = ?updated.gas_used,
            "Transaction record updated"
        );
        Ok(updated)
    }

    /// Record by id.
    pub fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn by_status(&self, status: TxStatus) -> Vec<TransactionRecord> {
        self.read()
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// First record whose hash matches, ignoring hex case.
    pub fn by_hash(&self, hash: &str) -> Option<TransactionRecord> {
        let hash = hash.trim();
        self.read()
            .iter()
            .find(|r| r.hash.eq_ignore_ascii_case(hash))
            .cloned()
    }

    /// The `n` most recent records.
    pub fn recent(&self, n: usize) -> Vec<TransactionRecord> {
        self.read().iter().take(n).cloned().collect()
    }

    pub fn all(&self) -> Vec<TransactionRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Counts per status plus confirmed amount totals.
    pub fn statistics(&self) -> LedgerStatistics {
        let records = self.read();

        let mut confirmed = 0;
        let mut pending = 0;
        let mut failed = 0;
        let mut fiat = U256::ZERO;
        let mut crypto = U256::ZERO;

        for record in records.iter() {
            match record.status {
                TxStatus::Pending => pending += 1,
                TxStatus::Failed => failed += 1,
                TxStatus::Confirmed => {
                    confirmed += 1;
                    match (
                        parse_amount(&record.amount_fiat, FIAT_DECIMALS),
                        parse_amount(&record.amount_crypto, NATIVE_DECIMALS),
                    ) {
                        (Ok(f), Ok(c)) => {
                            fiat = fiat.saturating_add(f);
                            crypto = crypto.saturating_add(c);
                        }
                        _ => warn!(record_id = %record.id, "Skipping unparseable amounts in statistics"),
                    }
                }
            }
        }

        LedgerStatistics {
            total: records.len(),
            confirmed,
            pending,
            failed,
            total_amount_fiat: format_amount(fiat, FIAT_DECIMALS),
            total_amount_crypto: format_amount(crypto, NATIVE_DECIMALS),
        }
    }

    /// Remove every record.
    pub fn clear(&self) -> BridgeResult<usize> {
        let mut records = self.write();
        let removed = std::mem::take(&mut *records);
        if let Err(e) = self.persist(&records) {
            *records = removed;
            warn!(error = %e, "Failed to persist cleared ledger");
            return Err(e);
        }
        info!(removed = removed.len(), "Transaction ledger cleared");
        Ok(removed.len())
    }

    /// The ledger in its persisted document form.
    pub fn export_snapshot(&self) -> BridgeResult<String> {
        Ok(render_snapshot(&self.read())?)
    }
}
