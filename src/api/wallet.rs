// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet session endpoints: connect, disconnect, provider signals and
//! balance queries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    blockchain::{validate_address, NativeBalance},
    error::{ApiError, BridgeError},
    gateway::{ProviderEvent, WalletSession},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Current session state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    /// "disconnected", "connecting" or "connected"
    pub state: String,
    /// Target network name
    pub network: String,
    /// Target chain ID
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<WalletSession>,
}

/// Signal pushed by the wallet provider.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEventRequest {
    /// Exposed accounts changed; an empty list means none are left
    AccountsChanged { accounts: Vec<String> },
    /// Provider switched to another chain
    ChainChanged { chain_id: u64 },
}

fn session_response(state: &AppState) -> SessionResponse {
    let gateway = state.bridge.gateway();
    SessionResponse {
        state: gateway.state().as_str().to_string(),
        network: gateway.network().name.to_string(),
        chain_id: gateway.network().chain_id,
        session: gateway.session(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Get the wallet session.
#[utoipa::path(
    get,
    path = "/v1/wallet/session",
    tag = "Wallet",
    responses(
        (status = 200, description = "Current session state", body = SessionResponse)
    )
)]
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(session_response(&state))
}

/// Connect the wallet.
///
/// Initializes the provider on the target network if needed, then binds the
/// session to the primary account.
#[utoipa::path(
    post,
    path = "/v1/wallet/connect",
    tag = "Wallet",
    responses(
        (status = 200, description = "Wallet connected", body = SessionResponse),
        (status = 409, description = "No accounts available"),
        (status = 502, description = "Network switch failed"),
        (status = 503, description = "No wallet provider")
    )
)]
pub async fn connect(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
    state.bridge.connect().await?;
    Ok(Json(session_response(&state)))
}

/// Re-run the network handshake and connect again.
#[utoipa::path(
    post,
    path = "/v1/wallet/reconnect",
    tag = "Wallet",
    responses(
        (status = 200, description = "Wallet reconnected", body = SessionResponse),
        (status = 409, description = "No accounts available"),
        (status = 502, description = "Network switch failed"),
        (status = 503, description = "No wallet provider")
    )
)]
pub async fn reconnect(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
    state.bridge.reconnect().await?;
    Ok(Json(session_response(&state)))
}

/// Disconnect the wallet.
#[utoipa::path(
    post,
    path = "/v1/wallet/disconnect",
    tag = "Wallet",
    responses(
        (status = 204, description = "Wallet disconnected")
    )
)]
pub async fn disconnect(State(state): State<AppState>) -> StatusCode {
    state.bridge.gateway().disconnect();
    StatusCode::NO_CONTENT
}

/// Deliver a provider signal (account or chain change).
#[utoipa::path(
    post,
    path = "/v1/wallet/events",
    tag = "Wallet",
    request_body = WalletEventRequest,
    responses(
        (status = 200, description = "Signal applied", body = SessionResponse),
        (status = 400, description = "Invalid account address")
    )
)]
pub async fn wallet_event(
    State(state): State<AppState>,
    Json(request): Json<WalletEventRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let event = match request {
        WalletEventRequest::AccountsChanged { accounts } => {
            let parsed = accounts
                .iter()
                .map(|a| validate_address(a).map_err(|e| BridgeError::invalid_address(a, e)))
                .collect::<Result<Vec<_>, _>>()?;
            ProviderEvent::AccountsChanged(parsed)
        }
        WalletEventRequest::ChainChanged { chain_id } => ProviderEvent::ChainChanged(chain_id),
    };

    state.bridge.handle_event(event);
    Ok(Json(session_response(&state)))
}

/// Native balance of the connected account.
#[utoipa::path(
    get,
    path = "/v1/wallet/balance",
    tag = "Wallet",
    responses(
        (status = 200, description = "Balance retrieved", body = NativeBalance),
        (status = 409, description = "Wallet not connected"),
        (status = 502, description = "Balance query failed")
    )
)]
pub async fn session_balance(
    State(state): State<AppState>,
) -> Result<Json<NativeBalance>, ApiError> {
    let session = state.bridge.gateway().require_session()?;
    let address = session.address.to_checksum(None);
    Ok(Json(state.bridge.gateway().native_balance(&address).await?))
}

/// Native balance of any address.
#[utoipa::path(
    get,
    path = "/v1/wallet/balance/{address}",
    tag = "Wallet",
    params(
        ("address" = String, Path, description = "Address to query (0x + 40 hex)")
    ),
    responses(
        (status = 200, description = "Balance retrieved", body = NativeBalance),
        (status = 400, description = "Invalid address"),
        (status = 502, description = "Balance query failed")
    )
)]
pub async fn address_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<NativeBalance>, ApiError> {
    Ok(Json(state.bridge.gateway().native_balance(&address).await?))
}
