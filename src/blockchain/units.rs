// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decimal amount handling.
//!
//! Amounts travel through the bridge as human-readable decimal strings
//! ("1.5") and are converted to integer base units only at the edges:
//! wei for native transfers, paise for INR sums.

use alloy::primitives::U256;

use super::types::TokenRate;

/// Decimals of the native currency on Polygon.
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimals used for INR amounts.
pub const FIAT_DECIMALS: u8 = 2;

/// Decimals of a quoted crypto amount.
pub const QUOTE_DECIMALS: u8 = 4;

/// Errors raised while parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount format: {0}")]
    Malformed(String),

    #[error("too many decimal places (max {0})")]
    TooManyDecimals(u8),

    #[error("amount overflow")]
    Overflow,

    #[error("conversion rate for {0} is zero")]
    ZeroRate(String),
}

/// Parse a human-readable amount to base units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for MATIC, 2 for INR)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(AmountError::Malformed(amount.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooManyDecimals(decimals));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| AmountError::Overflow)?
    };

    // Pad with zeros to match decimals
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| AmountError::Overflow)?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Format base units to a human-readable amount, trimming trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Convert an INR amount to a token amount using a static rate.
///
/// The result is rounded half-up to [`QUOTE_DECIMALS`] places.
pub fn quote_fiat(amount_fiat: &str, rate: &TokenRate) -> Result<String, AmountError> {
    let fiat = parse_amount(amount_fiat, FIAT_DECIMALS)?;
    let price = parse_amount(rate.inr_rate, FIAT_DECIMALS)?;
    if price.is_zero() {
        return Err(AmountError::ZeroRate(rate.symbol.to_string()));
    }

    let scale = U256::from(10u64).pow(U256::from(QUOTE_DECIMALS));
    let two = U256::from(2u64);
    let numerator = fiat
        .checked_mul(scale)
        .and_then(|n| n.checked_mul(two))
        .and_then(|n| n.checked_add(price))
        .ok_or(AmountError::Overflow)?;
    let quoted = numerator / (price * two);

    Ok(format_amount(quoted, QUOTE_DECIMALS))
}
