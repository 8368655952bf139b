// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for Polygon PoS.
//!
//! This module provides:
//! - The [`WalletProvider`] capability the bridge consumes
//! - An alloy-backed JSON-RPC implementation of it
//! - Address validation, amount conversion and static fiat rates

pub mod address;
pub mod client;
pub mod provider;
pub mod signing;
pub mod types;
pub mod units;

pub use address::{is_address, validate_address, AddressError};
pub use client::RpcWalletProvider;
pub use provider::{FeeData, ProviderError, TransferTx, TxReceipt, WalletProvider};
pub use types::*;
pub use units::{
    format_amount, parse_amount, quote_fiat, AmountError, FIAT_DECIMALS, NATIVE_DECIMALS,
    QUOTE_DECIMALS,
};
