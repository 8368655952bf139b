// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Bridge Context
//!
//! Builds every component once, hands them to each other by `Arc`, and
//! tears them down explicitly.
//!
//! ## Pay flow
//!
//! ```text
//! pay(order)
//!   -> Recipient::parse            (handle, address or upi:// URI)
//!   -> Quote::compute              (when no crypto amount was given)
//!   -> PaymentExecutor             (resolve, validate, broadcast, await inclusion)
//!   -> TransactionLedger::append   (status = pending)
//!   -> ConfirmationPoller::schedule
//! ```
//!
//! The append always happens before the schedule for the same record. A
//! broadcast transfer that misses the inclusion bound is still appended and
//! scheduled; the returned `Timeout` names its record.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blockchain::{parse_amount, NetworkConfig, WalletProvider, FIAT_DECIMALS};
use crate::config::BridgeConfig;
use crate::confirmation_poller::{ConfirmationPoller, PollerConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::executor::{PaymentExecutor, DEFAULT_INCLUSION_TIMEOUT};
use crate::gateway::{ProviderEvent, WalletGateway, WalletSession};
use crate::ledger::{NewTransaction, TransactionLedger};
use crate::models::{PaymentOrder, PaymentOutcome, Quote, Recipient, TransferRequest};
use crate::resolver::IdentifierResolver;
use crate::storage::{BlobStore, StoragePaths, StorageResult, TransactionRecord, TxStatus};

/// What the ledger needs to know about a broadcast transfer.
struct PendingPayment {
    hash: String,
    from: String,
    to: String,
    amount_crypto: String,
    identifier: Option<String>,
}

/// All bridge components, owned together.
pub struct Bridge {
    resolver: Arc<IdentifierResolver>,
    gateway: Arc<WalletGateway>,
    executor: PaymentExecutor,
    ledger: Arc<TransactionLedger>,
    poller: ConfirmationPoller,
    shutdown: CancellationToken,
    storage: Option<BlobStore>,
}

impl Bridge {
    /// Open the persisted state under `config.data_dir` and wire the
    /// components around `provider`.
    pub fn open(config: &BridgeConfig, provider: Arc<dyn WalletProvider>) -> BridgeResult<Self> {
        let storage = BlobStore::open(StoragePaths::new(&config.data_dir))?;
        let resolver = IdentifierResolver::load(storage.clone())?;
        let ledger = TransactionLedger::load(storage.clone())?;

        info!(
            data_dir = %config.data_dir.display(),
            network = config.network.name,
            "Bridge opened"
        );
        Ok(Self::assemble(
            provider,
            config.network.clone(),
            resolver,
            ledger,
            config.poller,
            config.inclusion_timeout,
            Some(storage),
        ))
    }

    /// Bridge with no persistence.
    pub fn in_memory(
        provider: Arc<dyn WalletProvider>,
        network: NetworkConfig,
        poller: PollerConfig,
    ) -> Self {
        Self::assemble(
            provider,
            network,
            IdentifierResolver::in_memory(),
            TransactionLedger::in_memory(),
            poller,
            DEFAULT_INCLUSION_TIMEOUT,
            None,
        )
    }

    fn assemble(
        provider: Arc<dyn WalletProvider>,
        network: NetworkConfig,
        resolver: IdentifierResolver,
        ledger: TransactionLedger,
        poller: PollerConfig,
        inclusion_timeout: std::time::Duration,
        storage: Option<BlobStore>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let resolver = Arc::new(resolver);
        let ledger = Arc::new(ledger);
        let gateway = Arc::new(WalletGateway::new(provider, network));
        let executor = PaymentExecutor::new(gateway.clone(), resolver.clone())
            .with_inclusion_timeout(inclusion_timeout);
        let poller = ConfirmationPoller::new(gateway.clone(), ledger.clone(), poller, shutdown.clone());

        Self {
            resolver,
            gateway,
            executor,
            ledger,
            poller,
            shutdown,
            storage,
        }
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn gateway(&self) -> &WalletGateway {
        &self.gateway
    }

    pub fn executor(&self) -> &PaymentExecutor {
        &self.executor
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn poller(&self) -> &ConfirmationPoller {
        &self.poller
    }

    pub fn network(&self) -> &NetworkConfig {
        self.gateway.network()
    }

    /// Token cancelled when the bridge shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Connect the wallet, initializing the provider first if needed.
    pub async fn connect(&self) -> BridgeResult<WalletSession> {
        self.gateway.connect().await?;
        self.gateway.require_session()
    }

    /// Re-run the network handshake and connect again.
    ///
    /// This is how a session invalidated by a network change is restored.
    pub async fn reconnect(&self) -> BridgeResult<WalletSession> {
        self.gateway.disconnect();
        self.gateway.initialize().await?;
        self.connect().await
    }

    /// Forward an unsolicited provider signal to the gateway.
    pub fn handle_event(&self, event: ProviderEvent) {
        self.gateway.handle_event(event);
    }

    /// Quote an INR amount in the network's native token.
    pub fn quote(&self, amount_fiat: &str) -> BridgeResult<Quote> {
        Quote::compute(amount_fiat, self.network().native_currency.symbol)
    }

    /// Pay an order end to end and start tracking its confirmation.
    pub async fn pay(&self, order: PaymentOrder) -> BridgeResult<PaymentOutcome> {
        let fiat = parse_amount(&order.amount_fiat, FIAT_DECIMALS)
            .map_err(|e| BridgeError::invalid_amount("amount_fiat", e))?;
        if fiat.is_zero() {
            return Err(BridgeError::InvalidRequest(
                "amount_fiat must be greater than zero".to_string(),
            ));
        }
        let recipient = Recipient::parse(&order.recipient)?;

        let amount_crypto = match order.amount_crypto.as_deref().map(str::trim) {
            Some(amount) if !amount.is_empty() => amount.to_string(),
            _ => self.quote(&order.amount_fiat)?.amount_crypto,
        };

        let request = match recipient {
            Recipient::Identifier(identifier) => self
                .executor
                .request_for_identifier(&identifier, &amount_crypto)?,
            Recipient::Address(address) => {
                TransferRequest::to_address(address, amount_crypto.as_str())
            }
        };

        let broadcast = self.executor.broadcast(request).await?;
        let pending = PendingPayment {
            hash: broadcast.hash.clone(),
            from: broadcast.from.clone(),
            to: broadcast.to.clone(),
            amount_crypto: broadcast.amount_crypto.clone(),
            identifier: broadcast.identifier.clone(),
        };

        let submission = match self.executor.await_inclusion(broadcast).await {
            Ok(submission) => submission,
            Err(BridgeError::Timeout {
                tx_hash,
                waited_secs,
                ..
            }) => {
                // Already broadcast: keep tracking it so a late inclusion still settles.
                let record_id = self.record_pending(&pending, &order).ok().map(|record| {
                    let scheduled = self.poller.schedule(&record.hash, &record.id);
                    warn!(
                        %tx_hash,
                        record_id = %record.id,
                        scheduled,
                        "Transfer not included in time, left pending for confirmation"
                    );
                    record.id
                });
                return Err(BridgeError::Timeout {
                    tx_hash,
                    waited_secs,
                    record_id,
                });
            }
            Err(e) => return Err(e),
        };

        let record = self.record_pending(&pending, &order)?;
        let confirmation_scheduled = self.poller.schedule(&record.hash, &record.id);
        Ok(PaymentOutcome {
            submission,
            record,
            confirmation_scheduled,
        })
    }

    fn record_pending(
        &self,
        payment: &PendingPayment,
        order: &PaymentOrder,
    ) -> BridgeResult<TransactionRecord> {
        let network = self.network();
        self.ledger
            .append(NewTransaction {
                hash: payment.hash.clone(),
                from_address: payment.from.clone(),
                to_address: payment.to.clone(),
                amount_crypto: payment.amount_crypto.clone(),
                amount_fiat: order.amount_fiat.trim().to_string(),
                token_symbol: network.native_currency.symbol.to_string(),
                identifier: payment.identifier.clone(),
                note: order.note.clone().filter(|n| !n.trim().is_empty()),
                explorer_url: Some(network.explorer_tx_url(&payment.hash)),
            })
            .inspect_err(|e| {
                error!(tx_hash = %payment.hash, error = %e, "Transfer went through but could not be recorded");
            })
    }

    /// Schedule confirmation checks for records left pending by a previous run.
    pub fn resume_pending(&self) -> usize {
        let resumed = self
            .ledger
            .by_status(TxStatus::Pending)
            .iter()
            .filter(|r| self.poller.schedule(&r.hash, &r.id))
            .count();
        if resumed > 0 {
            info!(count = resumed, "Resumed confirmation checks");
        }
        resumed
    }

    /// Empty the ledger, stopping any confirmation checks first.
    pub fn clear_ledger(&self) -> BridgeResult<usize> {
        let cancelled = self.poller.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "Cancelled confirmation checks before clearing ledger");
        }
        self.ledger.clear()
    }

    /// Data directory probe, `None` when running without persistence.
    pub fn storage_health(&self) -> Option<StorageResult<()>> {
        self.storage.as_ref().map(BlobStore::health_check)
    }

    /// Stop background work and drop the wallet session.
    pub async fn shutdown(&self) {
        self.poller.shutdown().await;
        self.gateway.disconnect();
        info!("Bridge shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{POLYGON_AMOY, POLYGON_MAINNET};
    use crate::testing::{MockWalletProvider, CHECKSUMMED, PAYEE};
    use std::time::Duration;

    fn bridge() -> (Arc<MockWalletProvider>, Bridge) {
        let mock = Arc::new(MockWalletProvider::new(137));
        let bridge = Bridge::in_memory(mock.clone(), POLYGON_MAINNET, PollerConfig::default());
        (mock, bridge)
    }

    fn order(recipient: &str, amount_fiat: &str) -> PaymentOrder {
        PaymentOrder {
            recipient: recipient.to_string(),
            amount_fiat: amount_fiat.to_string(),
            amount_crypto: None,
            note: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pay_records_pending_then_confirms() {
        let (_mock, bridge) = bridge();
        bridge.resolver().add_mapping("shop@x", CHECKSUMMED).unwrap();
        bridge.connect().await.unwrap();

        let outcome = bridge.pay(order("Shop@X", "100")).await.unwrap();

        assert!(outcome.confirmation_scheduled);
        assert_eq!(outcome.record.status, TxStatus::Pending);
        assert_eq!(outcome.record.amount_crypto, "2.3529");
        assert_eq!(outcome.record.to_address, CHECKSUMMED);
        assert_eq!(outcome.record.identifier.as_deref(), Some("Shop@X"));
        assert_eq!(
            outcome.record.explorer_url,
            Some(format!("https://polygonscan.com/tx/{}", outcome.submission.hash))
        );
        assert_eq!(bridge.ledger().statistics().pending, 1);

        bridge.poller().wait_for(&outcome.record.id).await;
        let stats = bridge.ledger().statistics();
        assert_eq!((stats.confirmed, stats.pending), (1, 0));
        assert_eq!(stats.total_amount_fiat, "100");
    }

    #[tokio::test]
    async fn pay_to_address_with_explicit_amount() {
        let (mock, bridge) = bridge();
        bridge.connect().await.unwrap();

        let outcome = bridge
            .pay(PaymentOrder {
                amount_crypto: Some("0.5".into()),
                note: Some("lunch".into()),
                ..order(PAYEE, "21.25")
            })
            .await
            .unwrap();

        assert_eq!(outcome.record.amount_crypto, "0.5");
        assert_eq!(outcome.record.amount_fiat, "21.25");
        assert_eq!(outcome.record.note.as_deref(), Some("lunch"));
        assert_eq!(outcome.record.identifier, None);
        assert_eq!(mock.sent().len(), 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn pay_via_upi_uri_uses_payee_handle() {
        let (_mock, bridge) = bridge();
        bridge.resolver().add_mapping("cafe@upi", CHECKSUMMED).unwrap();
        bridge.connect().await.unwrap();

        let outcome = bridge
            .pay(order("upi://pay?pa=cafe@upi&pn=Cafe&am=85", "85"))
            .await
            .unwrap();
        assert_eq!(outcome.record.amount_crypto, "2");
        assert_eq!(outcome.record.identifier.as_deref(), Some("cafe@upi"));
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn failed_pay_leaves_ledger_untouched() {
        let (mock, bridge) = bridge();
        bridge.connect().await.unwrap();

        let err = bridge.pay(order("unknown@id", "10")).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnmappedIdentifier(_)));

        let err = bridge.pay(order(PAYEE, "0")).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));

        assert!(bridge.ledger().is_empty());
        assert!(mock.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_transfer_stays_tracked() {
        let (mock, bridge) = bridge();
        mock.set_include_on_send(false);
        bridge.connect().await.unwrap();

        let (tx_hash, record_id) = match bridge.pay(order(PAYEE, "100")).await {
            Err(BridgeError::Timeout {
                tx_hash, record_id, ..
            }) => (tx_hash, record_id),
            other => panic!("expected a timeout, got {other:?}"),
        };

        let record_id = record_id.expect("timed out transfer is recorded");
        let record = bridge.ledger().get(&record_id).unwrap();
        assert_eq!(record.hash, tx_hash);
        assert_eq!(record.status, TxStatus::Pending);
        assert_eq!(record.amount_fiat, "100");
        assert_eq!(bridge.ledger().statistics().pending, 1);
        assert_eq!(bridge.poller().in_flight(), 1);
        assert_eq!(mock.sent().len(), 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn pay_requires_connected_wallet() {
        let (mock, bridge) = bridge();
        let err = bridge.pay(order(PAYEE, "10")).await.unwrap_err();
        assert!(matches!(err, BridgeError::WalletNotConnected));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn reconnect_restores_session_after_network_change() {
        let (mock, bridge) = bridge();
        bridge.connect().await.unwrap();

        mock.set_active_chain(POLYGON_AMOY.chain_id);
        bridge.handle_event(ProviderEvent::ChainChanged(POLYGON_AMOY.chain_id));
        assert!(!bridge.gateway().is_connected());

        let session = bridge.reconnect().await.unwrap();
        assert_eq!(session.chain_id, 137);
        assert_eq!(mock.chain(), 137);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_outstanding_checks() {
        let (mock, bridge) = bridge();
        bridge.connect().await.unwrap();
        bridge.pay(order(PAYEE, "10")).await.unwrap();
        assert_eq!(bridge.poller().in_flight(), 1);
        let lookups = mock.call_count("transaction_receipt");

        assert_eq!(bridge.clear_ledger().unwrap(), 1);
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(bridge.poller().in_flight(), 0);
        assert_eq!(mock.call_count("transaction_receipt"), lookups);
        assert!(bridge.ledger().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reopened_bridge_resumes_pending_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            data_dir: dir.path().to_path_buf(),
            ..BridgeConfig::default()
        };

        let mock = Arc::new(MockWalletProvider::new(137));
        let first = Bridge::open(&config, mock.clone()).unwrap();
        first.resolver().add_mapping("shop@x", CHECKSUMMED).unwrap();
        first.connect().await.unwrap();
        let outcome = first.pay(order("shop@x", "100")).await.unwrap();
        first.shutdown().await;
        assert_eq!(first.ledger().statistics().pending, 1);
        drop(first);

        let second = Bridge::open(&config, mock.clone()).unwrap();
        assert_eq!(second.resolver().resolve("SHOP@x").as_deref(), Some(CHECKSUMMED));
        assert_eq!(second.resume_pending(), 1);

        second.poller().wait_for(&outcome.record.id).await;
        assert_eq!(
            second.ledger().get(&outcome.record.id).unwrap().status,
            TxStatus::Confirmed
        );
    }

    #[test]
    fn quote_uses_native_symbol() {
        let mock = Arc::new(MockWalletProvider::new(80002));
        let bridge = Bridge::in_memory(mock, POLYGON_AMOY, PollerConfig::default());
        let quote = bridge.quote("85").unwrap();
        assert_eq!(quote.token_symbol, "POL");
        assert_eq!(quote.amount_crypto, "2");
    }
}
