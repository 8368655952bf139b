// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted in-memory wallet provider for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::blockchain::{FeeData, NetworkConfig, ProviderError, TransferTx, TxReceipt, WalletProvider};

pub const PAYER: Address = Address::repeat_byte(0x11);
pub const PAYEE: &str = "0x2222222222222222222222222222222222222222";
pub const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

struct MockState {
    chain_id: u64,
    known_chains: HashSet<u64>,
    accounts: Vec<Address>,
    balance: U256,
    fee_data: FeeData,
    unavailable: bool,
    switch_error: Option<ProviderError>,
    add_error: Option<ProviderError>,
    send_error: Option<ProviderError>,
    /// Whether a sent transaction is immediately reported as included.
    include_on_send: bool,
    receipts: HashMap<B256, VecDeque<Result<Option<TxReceipt>, ProviderError>>>,
    included: HashSet<B256>,
    next_hash: u8,
    calls: Vec<&'static str>,
    sent: Vec<TransferTx>,
}

/// Wallet provider double with scripted answers and a call log.
pub struct MockWalletProvider {
    state: Mutex<MockState>,
}

impl MockWalletProvider {
    /// Provider on `chain_id` with one account that includes transfers
    /// immediately.
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Mutex::new(MockState {
                chain_id,
                known_chains: HashSet::from([chain_id]),
                accounts: vec![PAYER],
                balance: U256::from(2_500_000_000_000_000_000u64),
                fee_data: FeeData {
                    gas_price: Some(30_000_000_000),
                    max_fee_per_gas: Some(90_000_000_000),
                    max_priority_fee_per_gas: Some(30_000_000_000),
                },
                unavailable: false,
                switch_error: None,
                add_error: None,
                send_error: None,
                include_on_send: true,
                receipts: HashMap::new(),
                included: HashSet::new(),
                next_hash: 0,
                calls: Vec::new(),
                sent: Vec::new(),
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().expect("mock provider lock poisoned"))
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.with(|s| s.accounts = accounts);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.with(|s| s.unavailable = unavailable);
    }

    pub fn forget_chain(&self, chain_id: u64) {
        self.with(|s| {
            s.known_chains.remove(&chain_id);
        });
    }

    pub fn set_active_chain(&self, chain_id: u64) {
        self.with(|s| {
            s.known_chains.insert(chain_id);
            s.chain_id = chain_id;
        });
    }

    pub fn fail_switch(&self, error: ProviderError) {
        self.with(|s| s.switch_error = Some(error));
    }

    pub fn fail_add(&self, error: ProviderError) {
        self.with(|s| s.add_error = Some(error));
    }

    pub fn fail_send(&self, error: ProviderError) {
        self.with(|s| s.send_error = Some(error));
    }

    pub fn set_balance(&self, wei: U256) {
        self.with(|s| s.balance = wei);
    }

    pub fn set_include_on_send(&self, include: bool) {
        self.with(|s| s.include_on_send = include);
    }

    /// Queue receipt answers for `tx_hash`, consumed one per lookup.
    pub fn script_receipts(
        &self,
        tx_hash: B256,
        answers: Vec<Result<Option<TxReceipt>, ProviderError>>,
    ) {
        self.with(|s| s.receipts.entry(tx_hash).or_default().extend(answers));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| **c == name).count())
    }

    pub fn sent(&self) -> Vec<TransferTx> {
        self.with(|s| s.sent.clone())
    }

    pub fn chain(&self) -> u64 {
        self.with(|s| s.chain_id)
    }
}

/// Successful receipt helper.
pub fn receipt(tx_hash: B256, gas_used: u64, success: bool) -> TxReceipt {
    TxReceipt {
        tx_hash,
        block_number: 100,
        gas_used,
        success,
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.with(|s| {
            s.calls.push("chain_id");
            if s.unavailable {
                Err(ProviderError::Unavailable("no provider".to_string()))
            } else {
                Ok(s.chain_id)
            }
        })
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.with(|s| {
            s.calls.push("switch_chain");
            if let Some(e) = s.switch_error.clone() {
                return Err(e);
            }
            if !s.known_chains.contains(&chain_id) {
                return Err(ProviderError::UnrecognizedChain(chain_id));
            }
            s.chain_id = chain_id;
            Ok(())
        })
    }

    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError> {
        self.with(|s| {
            s.calls.push("add_chain");
            if let Some(e) = s.add_error.clone() {
                return Err(e);
            }
            s.known_chains.insert(network.chain_id);
            Ok(())
        })
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.with(|s| {
            s.calls.push("request_accounts");
            Ok(s.accounts.clone())
        })
    }

    async fn balance(&self, _address: Address) -> Result<U256, ProviderError> {
        self.with(|s| {
            s.calls.push("balance");
            if s.unavailable {
                Err(ProviderError::Rpc("node down".to_string()))
            } else {
                Ok(s.balance)
            }
        })
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        self.with(|s| {
            s.calls.push("fee_data");
            Ok(s.fee_data)
        })
    }

    async fn send_transaction(&self, tx: TransferTx) -> Result<B256, ProviderError> {
        self.with(|s| {
            s.calls.push("send_transaction");
            if let Some(e) = s.send_error.clone() {
                return Err(e);
            }
            s.next_hash = s.next_hash.wrapping_add(1);
            let hash = B256::repeat_byte(s.next_hash);
            s.sent.push(tx);
            if s.include_on_send {
                s.included.insert(hash);
            }
            Ok(hash)
        })
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, ProviderError> {
        self.with(|s| {
            s.calls.push("transaction_receipt");
            if let Some(answer) = s.receipts.get_mut(&tx_hash).and_then(|q| q.pop_front()) {
                return answer;
            }
            if s.included.contains(&tx_hash) {
                Ok(Some(receipt(tx_hash, 21_000, true)))
            } else {
                Ok(None)
            }
        })
    }
}
