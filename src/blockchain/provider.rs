// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provider capability.
//!
//! The bridge never talks to a chain directly. Everything it needs from the
//! outside world (accounts, network control, balances, fee data, submission
//! and receipt lookup) goes through [`WalletProvider`], so the same engine
//! runs against a live RPC endpoint or a scripted test double.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use super::types::NetworkConfig;

/// Fee parameters reported by the active network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    /// Legacy gas price in wei
    pub gas_price: Option<u128>,
    /// EIP-1559 max fee per gas in wei
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 priority fee per gas in wei
    pub max_priority_fee_per_gas: Option<u128>,
}

/// A native-currency transfer ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTx {
    pub from: Address,
    pub to: Address,
    /// Value in wei
    pub value: U256,
    pub fees: FeeData,
}

/// Transaction receipt after inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No usable provider or endpoint.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider does not know the requested chain.
    #[error("unrecognized chain id {0}")]
    UnrecognizedChain(u64),

    /// The signer declined the request.
    #[error("user rejected the request: {0}")]
    UserRejected(String),

    /// Node/RPC failure.
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Capability interface consumed by the bridge.
///
/// Any call may suspend on a wallet prompt or a network round trip.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain ID of the network the provider is currently pointed at.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Switch to a network. Fails with [`ProviderError::UnrecognizedChain`]
    /// if the network has not been registered.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Register a network (name, currency, RPC and explorer URLs).
    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError>;

    /// Request account access. The first entry is the primary account.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Native balance in wei.
    async fn balance(&self, address: Address) -> Result<U256, ProviderError>;

    /// Current fee parameters.
    async fn fee_data(&self) -> Result<FeeData, ProviderError>;

    /// Sign and broadcast a transfer, returning its hash.
    async fn send_transaction(&self, tx: TransferTx) -> Result<B256, ProviderError>;

    /// Receipt for a transaction, or `None` if it is not yet included.
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, ProviderError>;
}
