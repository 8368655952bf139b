// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Executor
//!
//! Validates a transfer, submits it through the wallet gateway and waits
//! for on-chain inclusion.
//!
//! Validation is purely local and always runs before the first provider
//! call. The inclusion wait is bounded; the default of 120 s covers about
//! sixty Polygon blocks.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use tracing::{debug, info, warn};

use crate::blockchain::{parse_amount, validate_address, TransferTx, TxReceipt, NATIVE_DECIMALS};
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::{WalletGateway, WalletSession};
use crate::models::{SubmissionResult, TransferRequest};
use crate::resolver::IdentifierResolver;

/// Default bound on the wait for inclusion.
pub const DEFAULT_INCLUSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between receipt lookups while waiting for inclusion.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A request that passed local validation.
#[derive(Debug, Clone)]
pub struct ValidatedTransfer {
    pub session: WalletSession,
    pub to: Address,
    pub value: U256,
}

/// A transfer the provider accepted, not yet known to be included.
#[derive(Debug, Clone)]
pub struct BroadcastTransfer {
    pub tx_hash: B256,
    /// `tx_hash` as 0x-prefixed lowercase hex
    pub hash: String,
    pub from: String,
    pub to: String,
    pub amount_crypto: String,
    pub identifier: Option<String>,
}

/// Submits native transfers on behalf of the connected session.
pub struct PaymentExecutor {
    gateway: Arc<WalletGateway>,
    resolver: Arc<IdentifierResolver>,
    inclusion_timeout: Duration,
}

impl PaymentExecutor {
    pub fn new(gateway: Arc<WalletGateway>, resolver: Arc<IdentifierResolver>) -> Self {
        Self {
            gateway,
            resolver,
            inclusion_timeout: DEFAULT_INCLUSION_TIMEOUT,
        }
    }

    pub fn with_inclusion_timeout(mut self, timeout: Duration) -> Self {
        self.inclusion_timeout = timeout;
        self
    }

    /// Local checks: positive amount, valid recipient, connected wallet.
    pub fn validate(&self, request: &TransferRequest) -> BridgeResult<ValidatedTransfer> {
        let value = parse_amount(&request.amount_crypto, NATIVE_DECIMALS)
            .map_err(|e| BridgeError::invalid_amount("amount_crypto", e))?;
        if value.is_zero() {
            return Err(BridgeError::InvalidRequest(
                "amount_crypto must be greater than zero".to_string(),
            ));
        }

        let to = validate_address(&request.to_address)
            .map_err(|e| BridgeError::invalid_address(&request.to_address, e))?;

        let session = self.gateway.require_session()?;
        Ok(ValidatedTransfer { session, to, value })
    }

    /// Submit `request` and wait until it is included.
    pub async fn execute(&self, request: TransferRequest) -> BridgeResult<SubmissionResult> {
        let broadcast = self.broadcast(request).await?;
        self.await_inclusion(broadcast).await
    }

    /// Validate `request` and hand it to the provider without waiting.
    ///
    /// Once this returns the transfer is out of the bridge's hands.
    pub async fn broadcast(&self, request: TransferRequest) -> BridgeResult<BroadcastTransfer> {
        let validated = self.validate(&request)?;
        let session = self.gateway.verify_network().await?;

        let fees = self.gateway.fee_data().await?;
        let tx = TransferTx {
            from: session.address,
            to: validated.to,
            value: validated.value,
            fees,
        };

        info!(
            from = %session.address,
            to = %validated.to,
            amount = %request.amount_crypto,
            identifier = ?request.identifier,
            "Submitting transfer"
        );
        let tx_hash = self.gateway.submit(tx).await?;
        let hash = format!("{tx_hash:#x}");
        info!(tx_hash = %hash, "Transfer broadcast, waiting for inclusion");

        Ok(BroadcastTransfer {
            tx_hash,
            hash,
            from: session.address.to_checksum(None),
            to: request.to_address,
            amount_crypto: request.amount_crypto.trim().to_string(),
            identifier: request.identifier,
        })
    }

    /// Wait for a broadcast transfer to land.
    ///
    /// Fails with `Timeout` once the inclusion bound passes and with
    /// `SubmissionError` if the transfer reverted.
    pub async fn await_inclusion(
        &self,
        broadcast: BroadcastTransfer,
    ) -> BridgeResult<SubmissionResult> {
        let receipt = self.wait_for_inclusion(broadcast.tx_hash).await?;
        let hash = broadcast.hash;
        if !receipt.success {
            warn!(tx_hash = %hash, block = receipt.block_number, "Transfer reverted");
            return Err(BridgeError::SubmissionError(format!(
                "transaction {hash} reverted in block {}",
                receipt.block_number
            )));
        }

        info!(
            tx_hash = %hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transfer included"
        );
        Ok(SubmissionResult {
            hash,
            from: broadcast.from,
            to: broadcast.to,
            amount_crypto: broadcast.amount_crypto,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
            identifier: broadcast.identifier,
        })
    }

    /// Resolve `identifier` and pay the mapped address.
    ///
    /// Unmapped identifiers fail before any provider call.
    pub async fn execute_via_identifier(
        &self,
        identifier: &str,
        amount_crypto: &str,
    ) -> BridgeResult<SubmissionResult> {
        let request = self.request_for_identifier(identifier, amount_crypto)?;
        self.execute(request).await
    }

    /// Transfer request to the address mapped to `identifier`.
    pub fn request_for_identifier(
        &self,
        identifier: &str,
        amount_crypto: &str,
    ) -> BridgeResult<TransferRequest> {
        let to_address = self
            .resolver
            .resolve(identifier)
            .ok_or_else(|| BridgeError::UnmappedIdentifier(identifier.trim().to_string()))?;
        debug!(%identifier, %to_address, "Identifier resolved");

        Ok(TransferRequest {
            to_address,
            amount_crypto: amount_crypto.to_string(),
            identifier: Some(identifier.trim().to_string()),
        })
    }

    async fn wait_for_inclusion(&self, tx_hash: B256) -> BridgeResult<TxReceipt> {
        let poll = async {
            loop {
                match self.gateway.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        warn!(tx_hash = ?tx_hash, error = %e, "Receipt lookup failed, retrying");
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(self.inclusion_timeout, poll)
            .await
            .map_err(|_| BridgeError::Timeout {
                tx_hash: format!("{tx_hash:#x}"),
                waited_secs: self.inclusion_timeout.as_secs(),
                record_id: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{ProviderError, POLYGON_MAINNET};
    use crate::testing::{receipt, MockWalletProvider, CHECKSUMMED, PAYEE, PAYER};

    struct Fixture {
        mock: Arc<MockWalletProvider>,
        gateway: Arc<WalletGateway>,
        executor: PaymentExecutor,
    }

    fn fixture() -> Fixture {
        let mock = Arc::new(MockWalletProvider::new(137));
        let gateway = Arc::new(WalletGateway::new(mock.clone(), POLYGON_MAINNET));
        let resolver = Arc::new(IdentifierResolver::in_memory());
        resolver.add_mapping("shop@x", CHECKSUMMED).unwrap();
        let executor = PaymentExecutor::new(gateway.clone(), resolver);
        Fixture {
            mock,
            gateway,
            executor,
        }
    }

    async fn connected() -> Fixture {
        let f = fixture();
        f.gateway.connect().await.unwrap();
        f
    }

    #[test]
    fn validate_checks_amount_then_address_then_session() {
        let f = fixture();

        let zero = TransferRequest::to_address(PAYEE, "0");
        assert!(matches!(
            f.executor.validate(&zero),
            Err(BridgeError::InvalidRequest(_))
        ));

        let garbage = TransferRequest::to_address(PAYEE, "-1");
        assert!(matches!(
            f.executor.validate(&garbage),
            Err(BridgeError::InvalidRequest(_))
        ));

        let bad_to = TransferRequest::to_address("0x12", "1");
        assert!(matches!(
            f.executor.validate(&bad_to),
            Err(BridgeError::InvalidAddress { .. })
        ));

        let ok = TransferRequest::to_address(PAYEE, "1");
        assert!(matches!(
            f.executor.validate(&ok),
            Err(BridgeError::WalletNotConnected)
        ));
        assert!(f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn execute_submits_and_returns_included_result() {
        let f = connected().await;

        let result = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1.5"))
            .await
            .unwrap();

        assert_eq!(result.to, PAYEE);
        assert_eq!(result.from, PAYER.to_checksum(None));
        assert_eq!(result.amount_crypto, "1.5");
        assert_eq!(result.gas_used, 21_000);
        assert!(result.hash.starts_with("0x"));

        let sent = f.mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(sent[0].fees.max_fee_per_gas, Some(90_000_000_000));
    }

    #[tokio::test]
    async fn identifier_resolves_before_any_provider_call() {
        let f = connected().await;
        let calls_before = f.mock.calls().len();

        let result = f
            .executor
            .execute_via_identifier("Shop@X", "1.5")
            .await
            .unwrap();

        assert_eq!(result.to, CHECKSUMMED);
        assert_eq!(result.amount_crypto, "1.5");
        assert_eq!(result.identifier.as_deref(), Some("Shop@X"));

        let calls = f.mock.calls();
        assert_eq!(
            &calls[calls_before..calls_before + 3],
            &["chain_id", "fee_data", "send_transaction"]
        );
    }

    #[tokio::test]
    async fn unmapped_identifier_makes_no_provider_call() {
        let f = connected().await;
        let calls_before = f.mock.calls().len();

        let err = f
            .executor
            .execute_via_identifier("unknown@id", "1.0")
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::UnmappedIdentifier(ref id) if id == "unknown@id"));
        assert_eq!(f.mock.calls().len(), calls_before);
        assert!(f.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn signer_rejection_is_transaction_rejected() {
        let f = connected().await;
        f.mock
            .fail_send(ProviderError::UserRejected("User denied transaction signature".into()));

        let err = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TransactionRejected(_)));
    }

    #[tokio::test]
    async fn rpc_failure_is_submission_error_with_message() {
        let f = connected().await;
        f.mock.fail_send(ProviderError::Rpc("insufficient funds for gas".into()));

        let err = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1"))
            .await
            .unwrap_err();
        match err {
            BridgeError::SubmissionError(msg) => assert!(msg.contains("insufficient funds")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn missing_inclusion_times_out() {
        let f = connected().await;
        f.mock.set_include_on_send(false);

        let err = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1"))
            .await
            .unwrap_err();
        match err {
            BridgeError::Timeout { waited_secs, .. } => assert_eq!(waited_secs, 120),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_inclusion_is_observed() {
        let f = connected().await;
        f.mock.set_include_on_send(false);
        let hash = B256::repeat_byte(1);
        f.mock.script_receipts(
            hash,
            vec![
                Ok(None),
                Err(ProviderError::Rpc("timeout".into())),
                Ok(Some(receipt(hash, 30_000, true))),
            ],
        );

        let result = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1"))
            .await
            .unwrap();
        assert_eq!(result.gas_used, 30_000);
        assert_eq!(f.mock.call_count("transaction_receipt"), 3);
    }

    #[tokio::test]
    async fn reverted_transfer_is_submission_error() {
        let f = connected().await;
        let hash = B256::repeat_byte(1);
        f.mock
            .script_receipts(hash, vec![Ok(Some(receipt(hash, 21_000, false)))]);

        let err = f
            .executor
            .execute(TransferRequest::to_address(PAYEE, "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::SubmissionError(_)));
    }
}
