// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Data Models
//!
//! Value types shared by the executor, the bridge context and the REST API.
//! All wire types derive `Serialize`/`Deserialize` and `ToSchema` for JSON
//! handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Recipients**: payment handles, raw addresses and `upi://pay` URIs
//! - **Transfers**: what the executor submits and what it returns
//! - **Orders**: the end-to-end pay request and its outcome
//! - **Quotes**: static INR to token conversion

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::blockchain::{parse_amount, quote_fiat, token_rate, FIAT_DECIMALS};
use crate::error::{BridgeError, BridgeResult};
use crate::storage::TransactionRecord;

// =============================================================================
// Recipients
// =============================================================================

/// Where a payment is going, as typed or scanned by the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Payment handle to resolve (`shop@phonepe`)
    Identifier(String),
    /// Wallet address given directly
    Address(String),
}

/// Fields of a `upi://pay?...` payment URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentUri {
    /// Payee handle (`pa`)
    pub payee: String,
    /// Payee display name (`pn`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    /// Requested INR amount (`am`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

const PAYMENT_URI_SCHEME: &str = "upi";

impl PaymentUri {
    /// Parse a `upi://pay` URI. The payee handle is mandatory.
    pub fn parse(input: &str) -> BridgeResult<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| BridgeError::InvalidRequest(format!("invalid payment URI: {e}")))?;
        if url.scheme() != PAYMENT_URI_SCHEME {
            return Err(BridgeError::InvalidRequest(format!(
                "unsupported payment URI scheme `{}`",
                url.scheme()
            )));
        }

        let mut payee = None;
        let mut payee_name = None;
        let mut amount = None;
        for (key, value) in url.query_pairs() {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "pa" => payee = Some(value),
                "pn" => payee_name = Some(value),
                "am" => amount = Some(value),
                _ => {}
            }
        }

        let payee = payee.ok_or_else(|| {
            BridgeError::InvalidRequest("payment URI has no payee (pa)".to_string())
        })?;
        Ok(Self {
            payee,
            payee_name,
            amount,
        })
    }
}

impl Recipient {
    /// Classify a recipient string.
    ///
    /// `upi://` URIs yield their payee handle, anything with an `@` is a
    /// handle and `0x...` is an address (validated later, by the executor).
    pub fn parse(input: &str) -> BridgeResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(BridgeError::InvalidRequest(
                "recipient must not be empty".to_string(),
            ));
        }

        if input
            .get(..PAYMENT_URI_SCHEME.len() + 3)
            .is_some_and(|p| p.eq_ignore_ascii_case("upi://"))
        {
            return Ok(Recipient::Identifier(PaymentUri::parse(input)?.payee));
        }
        if input.contains('@') {
            return Ok(Recipient::Identifier(input.to_string()));
        }
        if input.starts_with("0x") {
            return Ok(Recipient::Address(input.to_string()));
        }

        Err(BridgeError::InvalidRequest(format!(
            "recipient `{input}` is neither a payment handle nor a 0x address"
        )))
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// A native-currency transfer to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to_address: String,
    /// Decimal amount in native units
    pub amount_crypto: String,
    /// Handle the address was resolved from, if any
    pub identifier: Option<String>,
}

impl TransferRequest {
    pub fn to_address(to_address: impl Into<String>, amount_crypto: impl Into<String>) -> Self {
        Self {
            to_address: to_address.into(),
            amount_crypto: amount_crypto.into(),
            identifier: None,
        }
    }
}

/// Outcome of a transfer observed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmissionResult {
    /// Transaction hash (0x prefixed)
    pub hash: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    pub amount_crypto: String,
    /// Gas used by the included transaction
    pub gas_used: u64,
    /// Block the transaction landed in
    pub block_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// End-to-end payment request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentOrder {
    /// Payment handle, 0x address or `upi://pay` URI
    pub recipient: String,
    /// Amount in INR (at most two decimals)
    pub amount_fiat: String,
    /// Amount in native units; quoted from `amount_fiat` when absent
    #[serde(default)]
    pub amount_crypto: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// What `pay` returns once the transfer is included and recorded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentOutcome {
    pub submission: SubmissionResult,
    /// Ledger entry, still `pending` until the confirmation check runs
    pub record: TransactionRecord,
    /// Whether a confirmation check was scheduled for the record
    pub confirmation_scheduled: bool,
}

// =============================================================================
// Quotes
// =============================================================================

/// INR to token conversion at the static rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Quote {
    pub amount_fiat: String,
    pub token_symbol: String,
    /// INR price of one token
    pub rate: String,
    pub amount_crypto: String,
}

impl Quote {
    /// Quote `amount_fiat` INR in `token_symbol`.
    pub fn compute(amount_fiat: &str, token_symbol: &str) -> BridgeResult<Self> {
        let rate = token_rate(token_symbol).ok_or_else(|| {
            BridgeError::InvalidRequest(format!("no conversion rate for token `{token_symbol}`"))
        })?;

        let fiat = parse_amount(amount_fiat, FIAT_DECIMALS)
            .map_err(|e| BridgeError::invalid_amount("amount_fiat", e))?;
        if fiat.is_zero() {
            return Err(BridgeError::InvalidRequest(
                "amount_fiat must be greater than zero".to_string(),
            ));
        }

        let amount_crypto =
            quote_fiat(amount_fiat, &rate).map_err(|e| BridgeError::invalid_amount("amount_fiat", e))?;

        Ok(Self {
            amount_fiat: amount_fiat.trim().to_string(),
            token_symbol: rate.symbol.to_string(),
            rate: rate.inr_rate.to_string(),
            amount_crypto,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_classification() {
        assert_eq!(
            Recipient::parse(" shop@phonepe ").unwrap(),
            Recipient::Identifier("shop@phonepe".into())
        );
        assert_eq!(
            Recipient::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap(),
            Recipient::Address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into())
        );
        assert!(matches!(
            Recipient::parse("merchant"),
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(Recipient::parse("   ").is_err());
    }

    #[test]
    fn upi_uri_yields_payee_handle() {
        let recipient =
            Recipient::parse("upi://pay?pa=restaurant@gpay&pn=Spice%20Hub&am=250.00&cu=INR").unwrap();
        assert_eq!(recipient, Recipient::Identifier("restaurant@gpay".into()));

        let uri = PaymentUri::parse("upi://pay?pa=restaurant@gpay&pn=Spice%20Hub&am=250.00").unwrap();
        assert_eq!(uri.payee_name.as_deref(), Some("Spice Hub"));
        assert_eq!(uri.amount.as_deref(), Some("250.00"));
    }

    #[test]
    fn upi_uri_without_payee_is_rejected() {
        assert!(PaymentUri::parse("upi://pay?am=10").is_err());
        assert!(PaymentUri::parse("https://pay?pa=a@b").is_err());
    }

    #[test]
    fn quote_uses_static_rate() {
        let quote = Quote::compute("100", "matic").unwrap();
        assert_eq!(quote.token_symbol, "MATIC");
        assert_eq!(quote.rate, "42.5");
        assert_eq!(quote.amount_crypto, "2.3529");
    }

    #[test]
    fn quote_rejects_unknown_token_and_zero() {
        assert!(matches!(
            Quote::compute("100", "DOGE"),
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(Quote::compute("0", "MATIC").is_err());
        assert!(Quote::compute("1.234", "MATIC").is_err());
    }
}
