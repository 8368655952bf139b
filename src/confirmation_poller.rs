// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confirmation Poller
//!
//! Background check that moves a `pending` ledger record to its terminal
//! state once the chain has settled the transfer.
//!
//! ## Strategy
//!
//! One task per record. The task waits `initial_delay` (default 30 s), then
//! looks up the receipt up to `max_attempts` times with exponential backoff
//! (5 s, 10 s, 20 s, ... capped at 60 s):
//! 1. Successful receipt: record becomes `confirmed` with gas used and block.
//! 2. Reverted receipt: record becomes `failed`.
//! 3. No receipt after the last attempt: record becomes `failed`.
//!
//! Failures inside the task are logged, never returned; the caller that
//! scheduled it has long since moved on.
//!
//! ## Shutdown
//!
//! Every task runs under a child of the poller's `CancellationToken`.
//! Cancelling a single record or shutting the poller down stops the wait
//! without touching the ledger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy::primitives::B256;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blockchain::TxReceipt;
use crate::gateway::WalletGateway;
use crate::ledger::{TransactionLedger, TransactionUpdate};
use crate::storage::TxStatus;

/// Default delay before the first receipt lookup.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(30);

/// Default number of receipt lookups before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Retry policy of a confirmation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub initial_delay: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: BACKOFF_BASE,
            backoff_cap: BACKOFF_CAP,
        }
    }
}

impl PollerConfig {
    /// Wait after the `attempt`-th (1-based) lookup came back empty.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }
}

struct InFlight {
    /// Distinguishes a re-scheduled check from the cancelled one it replaced.
    generation: u64,
    token: CancellationToken,
    /// Taken by whoever waits on the task.
    handle: Option<JoinHandle<()>>,
}

type InFlightMap = Arc<Mutex<HashMap<String, InFlight>>>;

/// Schedules and supervises confirmation checks.
pub struct ConfirmationPoller {
    gateway: Arc<WalletGateway>,
    ledger: Arc<TransactionLedger>,
    config: PollerConfig,
    shutdown: CancellationToken,
    in_flight: InFlightMap,
    generations: AtomicU64,
}

enum Outcome {
    Included(TxReceipt),
    Reverted(TxReceipt),
    Exhausted,
    Cancelled,
}

impl ConfirmationPoller {
    pub fn new(
        gateway: Arc<WalletGateway>,
        ledger: Arc<TransactionLedger>,
        config: PollerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            ledger,
            config,
            shutdown,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Number of checks still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Start a confirmation check for `record_id`.
    ///
    /// Returns `false` without scheduling anything if a check for the record
    /// is already running, the record is missing or no longer pending, the
    /// hash is malformed, or the poller is shut down.
    pub fn schedule(&self, tx_hash: &str, record_id: &str) -> bool {
        if self.shutdown.is_cancelled() {
            warn!(%record_id, "Poller is shut down, not scheduling");
            return false;
        }

        let hash: B256 = match tx_hash.trim().parse() {
            Ok(hash) => hash,
            Err(e) => {
                warn!(%record_id, %tx_hash, error = %e, "Malformed transaction hash, not scheduling");
                return false;
            }
        };

        match self.ledger.get(record_id) {
            Some(record) if record.status == TxStatus::Pending => {}
            Some(record) => {
                debug!(%record_id, status = %record.status, "Record already settled");
                return false;
            }
            None => {
                warn!(%record_id, "Unknown record, not scheduling");
                return false;
            }
        }

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.contains_key(record_id) {
            debug!(%record_id, "Confirmation check already scheduled");
            return false;
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        let check = ConfirmationCheck {
            gateway: self.gateway.clone(),
            ledger: self.ledger.clone(),
            config: self.config,
            record_id: record_id.to_string(),
            tx_hash: hash,
            generation,
            token: token.clone(),
            in_flight: self.in_flight.clone(),
        };
        let handle = tokio::spawn(check.run());
        in_flight.insert(
            record_id.to_string(),
            InFlight {
                generation,
                token,
                handle: Some(handle),
            },
        );

        info!(
            %record_id,
            %tx_hash,
            delay_secs = self.config.initial_delay.as_secs(),
            "Confirmation check scheduled"
        );
        true
    }

    /// Stop the check for `record_id`. The record stays as it is.
    pub fn cancel(&self, record_id: &str) -> bool {
        let entry = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(record_id);
        match entry {
            Some(entry) => {
                entry.token.cancel();
                info!(%record_id, "Confirmation check cancelled");
                true
            }
            None => false,
        }
    }

    /// Stop every check.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, entry) in &drained {
            entry.token.cancel();
        }
        drained.len()
    }

    /// Wait for the check of `record_id` to finish, if one is running.
    ///
    /// The record stays tracked until its task exits, so it cannot be
    /// scheduled twice while being waited on.
    pub async fn wait_for(&self, record_id: &str) {
        let handle = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(record_id)
            .and_then(|entry| entry.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(%record_id, error = %e, "Confirmation task panicked");
            }
        }
    }

    /// Cancel all checks and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let drained: Vec<_> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let count = drained.len();
        for (record_id, entry) in drained {
            let Some(handle) = entry.handle else {
                continue;
            };
            if let Err(e) = handle.await {
                error!(%record_id, error = %e, "Confirmation task panicked");
            }
        }
        info!(stopped = count, "Confirmation poller shut down");
    }
}

/// One record's check, owned by its task.
struct ConfirmationCheck {
    gateway: Arc<WalletGateway>,
    ledger: Arc<TransactionLedger>,
    config: PollerConfig,
    record_id: String,
    tx_hash: B256,
    generation: u64,
    token: CancellationToken,
    in_flight: InFlightMap,
}

impl ConfirmationCheck {
    async fn run(self) {
        let outcome = self.poll().await;
        self.apply(outcome);

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(&self.record_id)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            in_flight.remove(&self.record_id);
        }
    }

    async fn poll(&self) -> Outcome {
        let mut delay = self.config.initial_delay;

        for attempt in 1..=self.config.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = self.token.cancelled() => return Outcome::Cancelled,
            }

            match self.gateway.transaction_receipt(self.tx_hash).await {
                Ok(Some(receipt)) if receipt.success => return Outcome::Included(receipt),
                Ok(Some(receipt)) => return Outcome::Reverted(receipt),
                Ok(None) => {
                    debug!(record_id = %self.record_id, attempt, "Transaction not yet included");
                }
                Err(e) => {
                    warn!(record_id = %self.record_id, attempt, error = %e, "Confirmation check failed");
                }
            }

            delay = self.config.backoff(attempt);
        }

        Outcome::Exhausted
    }

    fn apply(&self, outcome: Outcome) {
        let record_id = &self.record_id;
        let patch = match outcome {
            Outcome::Included(receipt) => {
                info!(%record_id, block = receipt.block_number, gas_used = receipt.gas_used, "Transaction confirmed");
                TransactionUpdate::confirmed(receipt.gas_used, receipt.block_number)
            }
            Outcome::Reverted(receipt) => {
                warn!(%record_id, block = receipt.block_number, "Transaction reverted");
                TransactionUpdate {
                    gas_used: Some(receipt.gas_used),
                    block_number: Some(receipt.block_number),
                    ..TransactionUpdate::failed()
                }
            }
            Outcome::Exhausted => {
                warn!(
                    %record_id,
                    attempts = self.config.max_attempts,
                    "No receipt after final attempt, marking failed"
                );
                TransactionUpdate::failed()
            }
            Outcome::Cancelled => {
                info!(%record_id, "Confirmation check stopped before completion");
                return;
            }
        };

        if let Err(e) = self.ledger.update(record_id, patch) {
            error!(%record_id, error = %e, "Failed to record confirmation outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{ProviderError, POLYGON_MAINNET};
    use crate::ledger::NewTransaction;
    use crate::testing::{receipt, MockWalletProvider, CHECKSUMMED};

    struct Fixture {
        mock: Arc<MockWalletProvider>,
        ledger: Arc<TransactionLedger>,
        poller: ConfirmationPoller,
    }

    fn fixture() -> Fixture {
        let mock = Arc::new(MockWalletProvider::new(137));
        let gateway = Arc::new(WalletGateway::new(mock.clone(), POLYGON_MAINNET));
        let ledger = Arc::new(TransactionLedger::in_memory());
        let poller = ConfirmationPoller::new(
            gateway,
            ledger.clone(),
            PollerConfig::default(),
            CancellationToken::new(),
        );
        Fixture {
            mock,
            ledger,
            poller,
        }
    }

    fn pending(ledger: &TransactionLedger, hash: B256) -> String {
        ledger
            .append(NewTransaction {
                hash: format!("{hash:#x}"),
                from_address: "0x1111111111111111111111111111111111111111".into(),
                to_address: CHECKSUMMED.into(),
                amount_crypto: "2.3529".into(),
                amount_fiat: "100".into(),
                token_symbol: "MATIC".into(),
                identifier: Some("shop@x".into()),
                note: None,
                explorer_url: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let config = PollerConfig::default();
        let secs: Vec<u64> = (1..=6).map(|a| config.backoff(a).as_secs()).collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 60, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn included_receipt_confirms_record() {
        let f = fixture();
        let hash = B256::repeat_byte(0xaa);
        f.mock
            .script_receipts(hash, vec![Ok(Some(receipt(hash, 21_000, true)))]);
        let id = pending(&f.ledger, hash);

        assert!(f.poller.schedule(&format!("{hash:#x}"), &id));
        f.poller.wait_for(&id).await;

        let record = f.ledger.get(&id).unwrap();
        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(record.gas_used, Some(21_000));
        assert_eq!(record.block_number, Some(100));

        let stats = f.ledger.statistics();
        assert_eq!((stats.total, stats.confirmed, stats.pending, stats.failed), (1, 1, 0, 0));
        assert_eq!(stats.total_amount_fiat, "100");
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_waits_for_initial_delay() {
        let f = fixture();
        let hash = B256::repeat_byte(0xab);
        let id = pending(&f.ledger, hash);

        assert!(f.poller.schedule(&format!("{hash:#x}"), &id));
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(f.mock.call_count("transaction_receipt"), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.mock.call_count("transaction_receipt"), 1);
        f.poller.cancel(&id);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_same_record_is_rejected() {
        let f = fixture();
        let hash = B256::repeat_byte(0xac);
        let id = pending(&f.ledger, hash);

        assert!(f.poller.schedule(&format!("{hash:#x}"), &id));
        assert!(!f.poller.schedule(&format!("{hash:#x}"), &id));
        assert_eq!(f.poller.in_flight(), 1);

        f.poller.wait_for(&id).await;
        // Settled records cannot be scheduled again either.
        assert!(!f.poller.schedule(&format!("{hash:#x}"), &id));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let f = fixture();
        let hash = B256::repeat_byte(0xad);
        f.mock.script_receipts(
            hash,
            vec![
                Err(ProviderError::Rpc("connection reset".into())),
                Ok(None),
                Ok(Some(receipt(hash, 25_000, true))),
            ],
        );
        let id = pending(&f.ledger, hash);

        f.poller.schedule(&format!("{hash:#x}"), &id);
        f.poller.wait_for(&id).await;

        assert_eq!(f.mock.call_count("transaction_receipt"), 3);
        assert_eq!(f.ledger.get(&id).unwrap().gas_used, Some(25_000));
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_fails_record() {
        let f = fixture();
        let hash = B256::repeat_byte(0xae);
        f.mock
            .script_receipts(hash, vec![Ok(Some(receipt(hash, 50_000, false)))]);
        let id = pending(&f.ledger, hash);

        f.poller.schedule(&format!("{hash:#x}"), &id);
        f.poller.wait_for(&id).await;

        let record = f.ledger.get(&id).unwrap();
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(record.gas_used, Some(50_000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_fail_record() {
        let f = fixture();
        let hash = B256::repeat_byte(0xaf);
        let id = pending(&f.ledger, hash);

        f.poller.schedule(&format!("{hash:#x}"), &id);
        f.poller.wait_for(&id).await;

        assert_eq!(f.mock.call_count("transaction_receipt"), 5);
        assert_eq!(f.ledger.get(&id).unwrap().status, TxStatus::Failed);
        assert_eq!(f.ledger.statistics().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_check_leaves_record_pending() {
        let f = fixture();
        let hash = B256::repeat_byte(0xb0);
        let id = pending(&f.ledger, hash);

        f.poller.schedule(&format!("{hash:#x}"), &id);
        assert!(f.poller.cancel(&id));
        assert!(!f.poller.cancel(&id));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(f.mock.call_count("transaction_receipt"), 0);
        assert_eq!(f.ledger.get(&id).unwrap().status, TxStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_record_can_be_rescheduled() {
        let f = fixture();
        let hash = B256::repeat_byte(0xb4);
        f.mock
            .script_receipts(hash, vec![Ok(Some(receipt(hash, 21_000, true)))]);
        let id = pending(&f.ledger, hash);

        assert!(f.poller.schedule(&format!("{hash:#x}"), &id));
        assert!(f.poller.cancel(&id));
        assert!(f.poller.schedule(&format!("{hash:#x}"), &id));

        // The cancelled task exits without dropping the new entry.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.poller.in_flight(), 1);
        assert!(!f.poller.schedule(&format!("{hash:#x}"), &id));

        f.poller.wait_for(&id).await;
        assert_eq!(f.ledger.get(&id).unwrap().status, TxStatus::Confirmed);
        assert_eq!(f.mock.call_count("transaction_receipt"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_all_checks_and_rejects_new_ones() {
        let f = fixture();
        let first = B256::repeat_byte(0xb1);
        let second = B256::repeat_byte(0xb2);
        let a = pending(&f.ledger, first);
        let b = pending(&f.ledger, second);

        f.poller.schedule(&format!("{first:#x}"), &a);
        f.poller.schedule(&format!("{second:#x}"), &b);
        f.poller.shutdown().await;

        assert_eq!(f.poller.in_flight(), 0);
        assert_eq!(f.ledger.by_status(TxStatus::Pending).len(), 2);
        assert!(!f.poller.schedule(&format!("{first:#x}"), &a));
    }

    #[tokio::test]
    async fn unknown_record_or_bad_hash_is_not_scheduled() {
        let f = fixture();
        let hash = B256::repeat_byte(0xb3);
        assert!(!f.poller.schedule(&format!("{hash:#x}"), "missing"));

        let id = pending(&f.ledger, hash);
        assert!(!f.poller.schedule("0xnothex", &id));
        assert_eq!(f.poller.in_flight(), 0);
    }
}
