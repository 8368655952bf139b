// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::NativeBalance,
    gateway::WalletSession,
    ledger::LedgerStatistics,
    models::{PaymentOrder, PaymentOutcome, PaymentUri, Quote, SubmissionResult},
    state::AppState,
    storage::{TransactionRecord, TxStatus},
};

pub mod health;
pub mod identifiers;
pub mod payments;
pub mod transactions;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        // Wallet session
        .route("/wallet/session", get(wallet::get_session))
        .route("/wallet/connect", post(wallet::connect))
        .route("/wallet/reconnect", post(wallet::reconnect))
        .route("/wallet/disconnect", post(wallet::disconnect))
        .route("/wallet/events", post(wallet::wallet_event))
        .route("/wallet/balance", get(wallet::session_balance))
        .route("/wallet/balance/{address}", get(wallet::address_balance))
        // Identifier mappings
        .route(
            "/identifiers",
            get(identifiers::list_identifiers).post(identifiers::add_identifier),
        )
        .route(
            "/identifiers/{identifier}",
            get(identifiers::resolve_identifier),
        )
        // Payments
        .route("/quote", get(payments::get_quote))
        .route("/payments", post(payments::create_payment))
        .route("/payments/scan", post(payments::scan_payment_uri))
        // Ledger
        .route(
            "/transactions",
            get(transactions::list_transactions).delete(transactions::clear_transactions),
        )
        .route("/transactions/stats", get(transactions::transaction_stats))
        .route("/transactions/export", get(transactions::export_transactions))
        .route(
            "/transactions/by-hash/{tx_hash}",
            get(transactions::get_transaction_by_hash),
        )
        .route(
            "/transactions/by-hash/{tx_hash}/receipt",
            get(transactions::get_onchain_status),
        )
        .route("/transactions/{id}", get(transactions::get_transaction));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        wallet::get_session,
        wallet::connect,
        wallet::reconnect,
        wallet::disconnect,
        wallet::wallet_event,
        wallet::session_balance,
        wallet::address_balance,
        identifiers::list_identifiers,
        identifiers::add_identifier,
        identifiers::resolve_identifier,
        payments::get_quote,
        payments::scan_payment_uri,
        payments::create_payment,
        transactions::list_transactions,
        transactions::transaction_stats,
        transactions::export_transactions,
        transactions::clear_transactions,
        transactions::get_transaction,
        transactions::get_transaction_by_hash,
        transactions::get_onchain_status
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            wallet::SessionResponse,
            wallet::WalletEventRequest,
            WalletSession,
            NativeBalance,
            identifiers::IdentifierMapping,
            payments::ScanRequest,
            payments::ScanResponse,
            PaymentOrder,
            PaymentOutcome,
            PaymentUri,
            Quote,
            SubmissionResult,
            transactions::TransactionListResponse,
            transactions::ClearResponse,
            transactions::OnChainStatus,
            TransactionRecord,
            TxStatus,
            LedgerStatistics
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Wallet", description = "Wallet session and balances"),
        (name = "Identifiers", description = "Payment handle to address mappings"),
        (name = "Payments", description = "Quotes and end-to-end payments"),
        (name = "Transactions", description = "Transaction ledger")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (_mock, state) = AppState::for_tests();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn static_segments_win_over_record_id() {
        let (_mock, state) = AppState::for_tests();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/transactions/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["total"], 0);
    }

    #[tokio::test]
    async fn unknown_record_is_json_404() {
        let (_mock, state) = AppState::for_tests();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/transactions/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().unwrap().contains("does-not-exist"));
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/v1/wallet/connect",
            "/v1/identifiers/{identifier}",
            "/v1/payments",
            "/v1/transactions/by-hash/{tx_hash}/receipt",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
