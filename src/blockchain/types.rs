// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Native currency metadata, as registered with a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Polygon network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Native gas currency
    pub native_currency: NativeCurrency,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL (no trailing slash)
    pub explorer_url: &'static str,
}

impl NetworkConfig {
    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    /// Look up a built-in network by chain ID.
    pub fn by_chain_id(chain_id: u64) -> Option<NetworkConfig> {
        KNOWN_NETWORKS
            .iter()
            .find(|n| n.chain_id == chain_id)
            .cloned()
    }

    /// Look up a built-in network by its short key (`polygon`, `amoy`).
    pub fn by_key(key: &str) -> Option<NetworkConfig> {
        match key.trim().to_ascii_lowercase().as_str() {
            NETWORK_POLYGON => Some(POLYGON_MAINNET),
            NETWORK_AMOY => Some(POLYGON_AMOY),
            _ => None,
        }
    }
}

/// Polygon PoS Mainnet configuration.
pub const POLYGON_MAINNET: NetworkConfig = NetworkConfig {
    name: "Polygon Mainnet",
    chain_id: 137,
    native_currency: NativeCurrency {
        name: "MATIC",
        symbol: "MATIC",
        decimals: 18,
    },
    rpc_url: "https://polygon-rpc.com/",
    explorer_url: "https://polygonscan.com",
};

/// Polygon Amoy Testnet configuration.
pub const POLYGON_AMOY: NetworkConfig = NetworkConfig {
    name: "Polygon Amoy Testnet",
    chain_id: 80002,
    native_currency: NativeCurrency {
        name: "POL",
        symbol: "POL",
        decimals: 18,
    },
    rpc_url: "https://rpc-amoy.polygon.technology/",
    explorer_url: "https://amoy.polygonscan.com",
};

pub const NETWORK_POLYGON: &str = "polygon";
pub const NETWORK_AMOY: &str = "amoy";

const KNOWN_NETWORKS: [NetworkConfig; 2] = [POLYGON_MAINNET, POLYGON_AMOY];

/// Static INR conversion rate for a token.
#[derive(Debug, Clone, Copy)]
pub struct TokenRate {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Price of one whole token in INR, as a decimal string with at most
    /// two fractional digits.
    pub inr_rate: &'static str,
}

/// Conversion table used for fiat quotes.
///
/// These are fixed constants and are deliberately not fed from a live
/// market-data source.
pub const TOKEN_RATES: [TokenRate; 5] = [
    TokenRate {
        symbol: "MATIC",
        name: "Polygon",
        inr_rate: "42.5",
    },
    // Successor ticker of MATIC, native on Amoy.
    TokenRate {
        symbol: "POL",
        name: "Polygon Ecosystem Token",
        inr_rate: "42.5",
    },
    TokenRate {
        symbol: "USDT",
        name: "Tether",
        inr_rate: "83.2",
    },
    TokenRate {
        symbol: "ETH",
        name: "Ethereum",
        inr_rate: "165000",
    },
    TokenRate {
        symbol: "USDC",
        name: "USD Coin",
        inr_rate: "83.1",
    },
];

/// Find the conversion rate for a token symbol (case-insensitive).
pub fn token_rate(symbol: &str) -> Option<TokenRate> {
    TOKEN_RATES
        .iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(symbol.trim()))
        .copied()
}

/// Native balance of an address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NativeBalance {
    /// Queried address
    pub address: String,
    /// Currency symbol (e.g., "MATIC")
    pub symbol: String,
    /// Balance in wei
    pub balance_raw: String,
    /// Balance as a decimal string
    pub balance_formatted: String,
}
