// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction ledger persistence.
//!
//! ## Storage Layout
//!
//! The whole ledger is one versioned blob, most recent record first:
//! ```text
//! {DATA_DIR}/cryptap_transactions.json
//!   { "version": 1, "transactions": [ {...}, {...} ] }
//! ```
//! The same document is what a ledger export produces, so an export can be
//! dropped back in place as a restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::paths::LEDGER_KEY;
use super::super::{BlobStore, StorageError, StorageResult};

/// Current ledger blob schema version.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Transaction status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Transaction has been submitted but not yet confirmed
    #[default]
    Pending,
    /// Transaction has been confirmed in a block
    Confirmed,
    /// Transaction failed or was reverted
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    /// Only `pending -> confirmed` and `pending -> failed` are allowed.
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        matches!(
            (self, next),
            (TxStatus::Pending, TxStatus::Confirmed) | (TxStatus::Pending, TxStatus::Failed)
        )
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TxStatus::Pending),
            "confirmed" => Ok(TxStatus::Confirmed),
            "failed" => Ok(TxStatus::Failed),
            other => Err(format!("unknown transaction status `{other}`")),
        }
    }
}

/// Ledger entry for one submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    /// Process-unique record identifier (UUID)
    pub id: String,
    /// Transaction hash (0x prefixed)
    pub hash: String,
    /// Sender address
    pub from_address: String,
    /// Recipient address
    pub to_address: String,
    /// Amount in the token's human-readable units
    pub amount_crypto: String,
    /// Amount in INR
    pub amount_fiat: String,
    /// Token symbol (e.g., "MATIC")
    pub token_symbol: String,
    /// Payment handle the recipient was resolved from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Free-form note from the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the record was appended
    pub created_at: DateTime<Utc>,
    /// When the record was last changed
    pub updated_at: DateTime<Utc>,
    /// Current transaction status
    pub status: TxStatus,
    /// Gas used (if confirmed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Block number (if included)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Block explorer URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Owned form of the ledger blob.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub transactions: Vec<TransactionRecord>,
}

/// Borrowed form used for writing, so persisting never clones the ledger.
#[derive(Serialize)]
struct LedgerSnapshotRef<'a> {
    version: u32,
    transactions: &'a [TransactionRecord],
}

impl LedgerSnapshot {
    /// Parse an exported or persisted ledger document.
    pub fn parse(text: &str) -> StorageResult<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_str(text)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> StorageResult<()> {
        if self.version == LEDGER_SCHEMA_VERSION {
            Ok(())
        } else {
            Err(StorageError::UnsupportedVersion {
                key: LEDGER_KEY.to_string(),
                found: self.version,
                expected: LEDGER_SCHEMA_VERSION,
            })
        }
    }
}

/// Serialize records in the canonical ledger document form.
pub fn render_snapshot(records: &[TransactionRecord]) -> StorageResult<String> {
    let snapshot = LedgerSnapshotRef {
        version: LEDGER_SCHEMA_VERSION,
        transactions: records,
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Repository for the ledger blob.
pub struct TransactionRepository<'a> {
    storage: &'a BlobStore,
}

impl<'a> TransactionRepository<'a> {
    /// Create a new TransactionRepository.
    pub fn new(storage: &'a BlobStore) -> Self {
        Self { storage }
    }

    /// Load all records; an absent blob is an empty ledger.
    pub fn load(&self) -> StorageResult<Vec<TransactionRecord>> {
        match self.storage.read_blob::<LedgerSnapshot>(LEDGER_KEY)? {
            Some(snapshot) => {
                snapshot.check_version()?;
                Ok(snapshot.transactions)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Rewrite the blob with `records`.
    pub fn save(&self, records: &[TransactionRecord]) -> StorageResult<()> {
        self.storage.write_blob(
            LEDGER_KEY,
            &LedgerSnapshotRef {
                version: LEDGER_SCHEMA_VERSION,
                transactions: records,
            },
        )
    }
}
