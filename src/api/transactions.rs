// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction ledger endpoints.

use alloy::primitives::B256;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    ledger::LedgerStatistics,
    state::AppState,
    storage::{TransactionRecord, TxStatus},
};

const DEFAULT_LIST_LIMIT: usize = 50;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for transaction list.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Status filter: "pending", "confirmed" or "failed"
    pub status: Option<String>,
    /// Maximum number of results, newest first (default: 50)
    #[param(default = 50)]
    pub limit: Option<usize>,
}

/// Transaction list response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionRecord>,
}

/// Records removed by a clear.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Live on-chain view of a transaction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnChainStatus {
    pub tx_hash: String,
    /// Whether a receipt exists yet
    pub included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List recorded transactions, newest first.
#[utoipa::path(
    get,
    path = "/v1/transactions",
    params(TransactionListQuery),
    tag = "Transactions",
    responses(
        (status = 200, body = TransactionListResponse),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let ledger = state.bridge.ledger();

    let transactions = match query.status.as_deref() {
        Some(status) => {
            let status: TxStatus = status.parse().map_err(ApiError::bad_request)?;
            ledger.by_status(status).into_iter().take(limit).collect()
        }
        None => ledger.recent(limit),
    };

    Ok(Json(TransactionListResponse { transactions }))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/stats",
    tag = "Transactions",
    responses((status = 200, body = LedgerStatistics))
)]
pub async fn transaction_stats(State(state): State<AppState>) -> Json<LedgerStatistics> {
    Json(state.bridge.ledger().statistics())
}

/// Download the ledger as a JSON document.
#[utoipa::path(
    get,
    path = "/v1/transactions/export",
    tag = "Transactions",
    responses((status = 200, description = "Ledger document", body = String, content_type = "application/json"))
)]
pub async fn export_transactions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.bridge.ledger().export_snapshot()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], document))
}

/// Remove every record and stop pending confirmation checks.
#[utoipa::path(
    delete,
    path = "/v1/transactions",
    tag = "Transactions",
    responses((status = 200, body = ClearResponse))
)]
pub async fn clear_transactions(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.bridge.clear_ledger()?;
    Ok(Json(ClearResponse { removed }))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/{id}",
    params(
        ("id" = String, Path, description = "Record identifier")
    ),
    tag = "Transactions",
    responses(
        (status = 200, body = TransactionRecord),
        (status = 404, description = "No such record")
    )
)]
pub async fn get_transaction(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionRecord>, ApiError> {
    state
        .bridge
        .ledger()
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("transaction record {id} not found")))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/by-hash/{tx_hash}",
    params(
        ("tx_hash" = String, Path, description = "Transaction hash (0x prefixed)")
    ),
    tag = "Transactions",
    responses(
        (status = 200, body = TransactionRecord),
        (status = 404, description = "No record with this hash")
    )
)]
pub async fn get_transaction_by_hash(
    Path(tx_hash): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionRecord>, ApiError> {
    state
        .bridge
        .ledger()
        .by_hash(&tx_hash)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no transaction record with hash {tx_hash}")))
}

/// Ask the network for the receipt of any transaction hash.
#[utoipa::path(
    get,
    path = "/v1/transactions/by-hash/{tx_hash}/receipt",
    params(
        ("tx_hash" = String, Path, description = "Transaction hash (0x prefixed)")
    ),
    tag = "Transactions",
    responses(
        (status = 200, body = OnChainStatus),
        (status = 400, description = "Malformed hash"),
        (status = 502, description = "Receipt lookup failed")
    )
)]
pub async fn get_onchain_status(
    Path(tx_hash): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<OnChainStatus>, ApiError> {
    let hash: B256 = tx_hash
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid transaction hash {tx_hash}")))?;

    let receipt = state.bridge.gateway().transaction_receipt(hash).await?;
    Ok(Json(OnChainStatus {
        tx_hash: format!("{hash:#x}"),
        included: receipt.is_some(),
        success: receipt.as_ref().map(|r| r.success),
        block_number: receipt.as_ref().map(|r| r.block_number),
        gas_used: receipt.as_ref().map(|r| r.gas_used),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentOrder;
    use crate::storage::LedgerSnapshot;
    use crate::testing::PAYEE;

    async fn paid_state() -> (AppState, TransactionRecord) {
        let (_mock, state) = AppState::for_tests();
        state.bridge.connect().await.unwrap();
        let outcome = state
            .bridge
            .pay(PaymentOrder {
                recipient: PAYEE.into(),
                amount_fiat: "42.50".into(),
                amount_crypto: None,
                note: None,
            })
            .await
            .unwrap();
        (state, outcome.record)
    }

    fn query(status: Option<&str>, limit: Option<usize>) -> Query<TransactionListQuery> {
        Query(TransactionListQuery {
            status: status.map(String::from),
            limit,
        })
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (state, record) = paid_state().await;

        let Json(all) = list_transactions(State(state.clone()), query(None, None))
            .await
            .unwrap();
        assert_eq!(all.transactions, vec![record.clone()]);

        let Json(pending) = list_transactions(State(state.clone()), query(Some("PENDING"), None))
            .await
            .unwrap();
        assert_eq!(pending.transactions.len(), 1);

        let Json(confirmed) =
            list_transactions(State(state.clone()), query(Some("confirmed"), None))
                .await
                .unwrap();
        assert!(confirmed.transactions.is_empty());

        let Json(none) = list_transactions(State(state.clone()), query(None, Some(0)))
            .await
            .unwrap();
        assert!(none.transactions.is_empty());

        let err = list_transactions(State(state.clone()), query(Some("lost"), None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        state.bridge.shutdown().await;
    }

    #[tokio::test]
    async fn lookups_by_id_and_hash() {
        let (state, record) = paid_state().await;

        let Json(by_id) = get_transaction(Path(record.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(by_id, record);

        let shouted = record.hash.to_uppercase().replacen("0X", "0x", 1);
        let Json(by_hash) = get_transaction_by_hash(Path(shouted), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(by_hash.id, record.id);

        let err = get_transaction(Path("missing".into()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        state.bridge.shutdown().await;
    }

    #[tokio::test]
    async fn onchain_status_reads_receipt() {
        let (state, record) = paid_state().await;

        let Json(status) = get_onchain_status(Path(record.hash.clone()), State(state.clone()))
            .await
            .unwrap();
        assert!(status.included);
        assert_eq!(status.success, Some(true));
        assert_eq!(status.gas_used, Some(21_000));
        assert_eq!(status.tx_hash, record.hash);

        let unknown = format!("{:#x}", B256::repeat_byte(0xee));
        let Json(status) = get_onchain_status(Path(unknown), State(state.clone()))
            .await
            .unwrap();
        assert!(!status.included);
        assert_eq!(status.block_number, None);

        let err = get_onchain_status(Path("0xnothex".into()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        state.bridge.shutdown().await;
    }

    #[tokio::test]
    async fn stats_export_and_clear() {
        let (state, record) = paid_state().await;

        let Json(stats) = transaction_stats(State(state.clone())).await;
        assert_eq!((stats.total, stats.pending), (1, 1));
        assert_eq!(stats.total_amount_fiat, "0");

        let document = state.bridge.ledger().export_snapshot().unwrap();
        let snapshot = LedgerSnapshot::parse(&document).unwrap();
        assert_eq!(snapshot.transactions, vec![record]);
        assert!(export_transactions(State(state.clone())).await.is_ok());

        let Json(cleared) = clear_transactions(State(state.clone())).await.unwrap();
        assert_eq!(cleared.removed, 1);
        assert_eq!(state.bridge.poller().in_flight(), 0);

        let Json(stats) = transaction_stats(State(state)).await;
        assert_eq!(stats.total, 0);
    }
}
