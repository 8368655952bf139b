// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, resolver::normalize_identifier, state::AppState};

/// One identifier to address mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentifierMapping {
    /// Payment handle (e.g., "shop@phonepe"), stored lowercased
    pub identifier: String,
    /// Wallet address (0x + 40 hex chars)
    pub address: String,
}

#[utoipa::path(
    get,
    path = "/v1/identifiers",
    tag = "Identifiers",
    responses((status = 200, body = [IdentifierMapping]))
)]
pub async fn list_identifiers(State(state): State<AppState>) -> Json<Vec<IdentifierMapping>> {
    let mappings = state
        .bridge
        .resolver()
        .all_mappings()
        .into_iter()
        .map(|(identifier, address)| IdentifierMapping {
            identifier,
            address,
        })
        .collect();
    Json(mappings)
}

#[utoipa::path(
    post,
    path = "/v1/identifiers",
    request_body = IdentifierMapping,
    tag = "Identifiers",
    responses(
        (status = 201, body = IdentifierMapping),
        (status = 400, description = "Invalid identifier or address")
    )
)]
pub async fn add_identifier(
    State(state): State<AppState>,
    Json(request): Json<IdentifierMapping>,
) -> Result<(StatusCode, Json<IdentifierMapping>), ApiError> {
    state
        .bridge
        .resolver()
        .add_mapping(&request.identifier, &request.address)?;

    let mapping = IdentifierMapping {
        identifier: normalize_identifier(&request.identifier),
        address: request.address,
    };
    Ok((StatusCode::CREATED, Json(mapping)))
}

#[utoipa::path(
    get,
    path = "/v1/identifiers/{identifier}",
    params(
        ("identifier" = String, Path, description = "Payment handle to resolve (case-insensitive)")
    ),
    tag = "Identifiers",
    responses(
        (status = 200, body = IdentifierMapping),
        (status = 404, description = "Identifier is not mapped")
    )
)]
pub async fn resolve_identifier(
    Path(identifier): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<IdentifierMapping>, ApiError> {
    let address = state.bridge.resolver().resolve(&identifier).ok_or_else(|| {
        ApiError::not_found(format!("identifier {} is not mapped", identifier.trim()))
    })?;

    Ok(Json(IdentifierMapping {
        identifier: normalize_identifier(&identifier),
        address,
    }))
}
