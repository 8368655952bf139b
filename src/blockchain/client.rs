// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC wallet provider backed by alloy.
//!
//! Plays the role a browser wallet plays for a dapp: it keeps a registry of
//! known networks, points at exactly one of them at a time and signs with a
//! locally held key.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy::{
    eips::BlockNumberOrTag,
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::TransportError,
};
use async_trait::async_trait;
use url::Url;

use super::provider::{FeeData, ProviderError, TransferTx, TxReceipt, WalletProvider};
use super::types::NetworkConfig;

/// Fallback base fee when the latest block carries none (30 gwei).
const DEFAULT_BASE_FEE: u128 = 30_000_000_000;

/// Polygon validators reject tips below 25 gwei; use 30 gwei as the floor.
const MIN_PRIORITY_FEE: u128 = 30_000_000_000;

/// JSON-RPC error code for a request the user declined (EIP-1193).
const USER_REJECTED_CODE: i64 = 4001;

struct RegisteredNetwork {
    config: NetworkConfig,
    rpc_url: Url,
}

#[derive(Clone)]
struct ActiveNetwork {
    chain_id: u64,
    provider: DynProvider,
}

/// Wallet provider that talks to an EVM node over HTTP.
pub struct RpcWalletProvider {
    networks: RwLock<HashMap<u64, RegisteredNetwork>>,
    active: RwLock<ActiveNetwork>,
    signer: Option<PrivateKeySigner>,
}

impl RpcWalletProvider {
    /// Create a provider pointed at `network`.
    ///
    /// `rpc_override` replaces the network's default RPC endpoint. Without a
    /// signer the provider reports no accounts and cannot submit.
    pub fn new(
        network: NetworkConfig,
        rpc_override: Option<&str>,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Self, ProviderError> {
        let raw_url = rpc_override.unwrap_or(network.rpc_url);
        let rpc_url: Url = raw_url
            .parse()
            .map_err(|e: url::ParseError| ProviderError::Unavailable(format!("invalid RPC URL {raw_url}: {e}")))?;

        let provider = build_provider(&rpc_url, signer.as_ref());
        let chain_id = network.chain_id;

        let mut networks = HashMap::new();
        networks.insert(chain_id, RegisteredNetwork { config: network, rpc_url });

        Ok(Self {
            networks: RwLock::new(networks),
            active: RwLock::new(ActiveNetwork { chain_id, provider }),
            signer,
        })
    }

    /// Address of the local signer, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Chain ID the provider was last switched to (no network call).
    pub fn active_chain_id(&self) -> u64 {
        self.active.read().unwrap_or_else(PoisonError::into_inner).chain_id
    }

    /// Names of all registered networks.
    pub fn registered_networks(&self) -> Vec<&'static str> {
        let networks = self.networks.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = networks.values().map(|n| n.config.name).collect();
        names.sort_unstable();
        names
    }

    fn provider(&self) -> DynProvider {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider
            .clone()
    }
}

fn build_provider(url: &Url, signer: Option<&PrivateKeySigner>) -> DynProvider {
    match signer {
        Some(signer) => ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(url.clone())
            .erased(),
        None => ProviderBuilder::new().connect_http(url.clone()).erased(),
    }
}

fn rpc_error(context: &str, e: TransportError) -> ProviderError {
    ProviderError::Rpc(format!("{context}: {e}"))
}

/// Map a submission failure, singling out signer rejections.
fn classify_send_error(e: TransportError) -> ProviderError {
    if let Some(payload) = e.as_error_resp() {
        if payload.code == USER_REJECTED_CODE {
            return ProviderError::UserRejected(payload.message.to_string());
        }
    }
    rpc_error("Failed to send", e)
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.provider()
            .get_chain_id()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let rpc_url = {
            let networks = self.networks.read().unwrap_or_else(PoisonError::into_inner);
            networks
                .get(&chain_id)
                .map(|n| n.rpc_url.clone())
                .ok_or(ProviderError::UnrecognizedChain(chain_id))?
        };

        let provider = build_provider(&rpc_url, self.signer.as_ref());
        let remote = provider
            .get_chain_id()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if remote != chain_id {
            return Err(ProviderError::Rpc(format!(
                "endpoint {rpc_url} reports chain {remote}, expected {chain_id}"
            )));
        }

        *self.active.write().unwrap_or_else(PoisonError::into_inner) =
            ActiveNetwork { chain_id, provider };
        tracing::info!(chain_id, rpc_url = %rpc_url, "Switched active network");
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError> {
        let rpc_url: Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ProviderError::Rpc(format!("invalid RPC URL: {e}")))?;

        let mut networks = self.networks.write().unwrap_or_else(PoisonError::into_inner);
        // Keep an operator-supplied endpoint if the chain is already known.
        networks
            .entry(network.chain_id)
            .or_insert_with(|| RegisteredNetwork {
                config: network.clone(),
                rpc_url,
            });
        Ok(())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(self.signer_address().into_iter().collect())
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.provider()
            .get_balance(address)
            .await
            .map_err(|e| rpc_error("Failed to get balance", e))
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        let provider = self.provider();

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| rpc_error("Failed to get block", e))?
            .ok_or_else(|| ProviderError::Rpc("No latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(DEFAULT_BASE_FEE);

        let priority_fee = provider
            .get_max_priority_fee_per_gas()
            .await
            .unwrap_or(MIN_PRIORITY_FEE)
            .max(MIN_PRIORITY_FEE);

        let gas_price = provider.get_gas_price().await.ok();

        // Max fee = 2 * base_fee + priority_fee (allows for base fee increase)
        let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);

        Ok(FeeData {
            gas_price,
            max_fee_per_gas: Some(max_fee),
            max_priority_fee_per_gas: Some(priority_fee),
        })
    }

    async fn send_transaction(&self, tx: TransferTx) -> Result<B256, ProviderError> {
        let Some(signer) = &self.signer else {
            return Err(ProviderError::Unavailable(
                "no signer configured".to_string(),
            ));
        };
        if signer.address() != tx.from {
            return Err(ProviderError::UserRejected(format!(
                "account {} is not managed by this provider",
                tx.from
            )));
        }

        let mut request = TransactionRequest::default()
            .from(tx.from)
            .to(tx.to)
            .value(tx.value);

        match (tx.fees.max_fee_per_gas, tx.fees.max_priority_fee_per_gas) {
            (Some(max_fee), Some(tip)) => {
                request = request.max_fee_per_gas(max_fee).max_priority_fee_per_gas(tip);
            }
            _ => {
                if let Some(gas_price) = tx.fees.gas_price {
                    request = request.gas_price(gas_price);
                }
            }
        }

        let pending = self
            .provider()
            .send_transaction(request)
            .await
            .map_err(classify_send_error)?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, ProviderError> {
        let receipt = self
            .provider()
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| rpc_error("Failed to get receipt", e))?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash,
            block_number: r.block_number.unwrap_or(0),
            gas_used: r.gas_used as u64,
            success: r.status(),
        }))
    }
}
