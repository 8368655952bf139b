// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment endpoints: quotes, scanned payment URIs and end-to-end payments.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{PaymentOrder, PaymentOutcome, PaymentUri, Quote},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct QuoteQuery {
    /// Amount in INR (at most two decimals)
    pub amount_fiat: String,
    /// Token symbol; defaults to the network's native token
    pub token: Option<String>,
}

/// Raw content of a scanned payment QR code.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScanRequest {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanResponse {
    pub uri: PaymentUri,
    /// Wallet address mapped to the payee handle, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Convert an INR amount to tokens at the static rate.
#[utoipa::path(
    get,
    path = "/v1/quote",
    params(QuoteQuery),
    tag = "Payments",
    responses(
        (status = 200, body = Quote),
        (status = 400, description = "Invalid amount or unknown token")
    )
)]
pub async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, ApiError> {
    let quote = match query.token.as_deref() {
        Some(token) => Quote::compute(&query.amount_fiat, token)?,
        None => state.bridge.quote(&query.amount_fiat)?,
    };
    Ok(Json(quote))
}

/// Parse a scanned `upi://pay` payload and look up its payee.
#[utoipa::path(
    post,
    path = "/v1/payments/scan",
    request_body = ScanRequest,
    tag = "Payments",
    responses(
        (status = 200, body = ScanResponse),
        (status = 400, description = "Not a payment URI")
    )
)]
pub async fn scan_payment_uri(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let uri = PaymentUri::parse(&request.payload)?;
    let resolved_address = state.bridge.resolver().resolve(&uri.payee);
    Ok(Json(ScanResponse {
        uri,
        resolved_address,
    }))
}

/// Pay an order end to end.
///
/// Returns once the transfer is included on-chain and recorded as pending.
/// Confirmation continues in the background.
#[utoipa::path(
    post,
    path = "/v1/payments",
    request_body = PaymentOrder,
    tag = "Payments",
    responses(
        (status = 201, description = "Transfer included and recorded", body = PaymentOutcome),
        (status = 400, description = "Invalid recipient or amount"),
        (status = 404, description = "Identifier is not mapped"),
        (status = 409, description = "Wallet not connected"),
        (status = 422, description = "Transaction rejected by the wallet"),
        (status = 502, description = "Submission failed"),
        (status = 504, description = "Transaction not included in time, still tracked as pending")
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(order): Json<PaymentOrder>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    let outcome = state.bridge.pay(order).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
