// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CrypTap Bridge - UPI handle to Polygon payment bridge
//!
//! Pays UPI-style payment handles (`shop@phonepe`) in native Polygon tokens.
//! A handle is resolved to a wallet address, the INR amount is quoted at a
//! static rate and the transfer is submitted through a wallet provider
//! session. Every included transfer lands in a persistent ledger and is
//! confirmed in the background.
//!
//! ## Modules
//!
//! - `resolver` - Identifier to address mapping
//! - `gateway` - Wallet session lifecycle and network handshake
//! - `executor` - Transfer validation, submission and inclusion wait
//! - `ledger` - Transaction records and their status machine
//! - `confirmation_poller` - Background confirmation checks
//! - `bridge` - Wiring of the above and the end-to-end pay flow
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - Provider capability and its JSON-RPC implementation
//! - `storage` - File-backed blob persistence

pub mod api;
pub mod blockchain;
pub mod bridge;
pub mod config;
pub mod confirmation_poller;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
