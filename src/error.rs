// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::{AddressError, AmountError};
use crate::storage::StorageError;

/// Failures surfaced by the payment bridge.
///
/// Every variant renders as a single descriptive message.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        address: String,
        reason: AddressError,
    },

    #[error("identifier {0} is not mapped to any wallet address")]
    UnmappedIdentifier(String),

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("no compatible wallet provider: {0}")]
    ProviderUnavailable(String),

    #[error("failed to switch network: {0}")]
    NetworkSwitchError(String),

    #[error("no accounts found")]
    NoAccounts,

    #[error("transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("payment failed: {0}")]
    SubmissionError(String),

    #[error("failed to get wallet balance: {0}")]
    BalanceQueryError(String),

    /// The transfer was broadcast but no receipt showed up in time.
    /// `record_id` names the pending ledger entry tracking it, if one exists.
    #[error(
        "transaction {tx_hash} was not included within {waited_secs}s{}",
        tracked_as(.record_id)
    )]
    Timeout {
        tx_hash: String,
        waited_secs: u64,
        record_id: Option<String>,
    },

    #[error("transaction record {0} not found")]
    NotFound(String),

    #[error("transaction record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BridgeError {
    pub fn invalid_address(address: impl Into<String>, reason: AddressError) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason,
        }
    }

    pub fn invalid_amount(field: &str, e: AmountError) -> Self {
        Self::InvalidRequest(format!("{field}: {e}"))
    }
}

fn tracked_as(record_id: &Option<String>) -> String {
    record_id
        .as_deref()
        .map(|id| format!("; still tracked as pending record {id}"))
        .unwrap_or_default()
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        let status = match &e {
            BridgeError::InvalidRequest(_) | BridgeError::InvalidAddress { .. } => {
                StatusCode::BAD_REQUEST
            }
            BridgeError::UnmappedIdentifier(_) | BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::WalletNotConnected
            | BridgeError::NoAccounts
            | BridgeError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BridgeError::TransactionRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BridgeError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::NetworkSwitchError(_)
            | BridgeError::SubmissionError(_)
            | BridgeError::BalanceQueryError(_) => StatusCode::BAD_GATEWAY,
            BridgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
