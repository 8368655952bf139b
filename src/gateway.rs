// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Gateway
//!
//! Owns the session between the bridge and the user's wallet provider.
//!
//! ## Session lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connecting --accounts--> Connected
//!      ^                                                   |
//!      +---- disconnect() / zero accounts / chain change --+
//! ```
//!
//! A chain change also clears the `initialized` flag, so the next
//! `connect()` re-runs the network handshake before touching accounts.
//! No other component holds the provider; the executor and the
//! confirmation poller go through the gateway for every call.

use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::{Address, B256};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::blockchain::{
    format_amount, validate_address, FeeData, NativeBalance, NetworkConfig, ProviderError,
    TransferTx, TxReceipt, WalletProvider,
};
use crate::error::{BridgeError, BridgeResult};

/// Live connection to one wallet account on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WalletSession {
    /// Primary account address
    #[schema(value_type = String)]
    pub address: Address,
    /// Network the session is bound to
    pub chain_id: u64,
    pub connected: bool,
}

/// Gateway connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected(WalletSession),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected(_) => "connected",
        }
    }
}

/// Signals pushed by the wallet provider outside of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed; empty means none are left.
    AccountsChanged(Vec<Address>),
    /// The provider moved to another network.
    ChainChanged(u64),
}

#[derive(Debug)]
struct GatewayState {
    initialized: bool,
    session: SessionState,
}

/// Session owner for the wallet provider.
pub struct WalletGateway {
    provider: Arc<dyn WalletProvider>,
    network: NetworkConfig,
    state: RwLock<GatewayState>,
    /// Serializes connect handshakes.
    handshake: Mutex<()>,
}

impl WalletGateway {
    pub fn new(provider: Arc<dyn WalletProvider>, network: NetworkConfig) -> Self {
        Self {
            provider,
            network,
            state: RwLock::new(GatewayState {
                initialized: false,
                session: SessionState::Disconnected,
            }),
            handshake: Mutex::new(()),
        }
    }

    /// Target network of this gateway.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn state(&self) -> SessionState {
        self.read(|s| s.session.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.read(|s| s.initialized)
    }

    /// Current session, if connected.
    pub fn session(&self) -> Option<WalletSession> {
        match self.state() {
            SessionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    /// Current session or `WalletNotConnected`.
    pub fn require_session(&self) -> BridgeResult<WalletSession> {
        self.session().ok_or(BridgeError::WalletNotConnected)
    }

    fn read<R>(&self, f: impl FnOnce(&GatewayState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut GatewayState) -> R) -> R {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Probe the provider and bring it onto the target network.
    pub async fn initialize(&self) -> BridgeResult<()> {
        let current = self
            .provider
            .chain_id()
            .await
            .map_err(|e| BridgeError::ProviderUnavailable(e.to_string()))?;

        if current != self.network.chain_id {
            info!(
                current,
                target = self.network.chain_id,
                "Provider on a different network, switching"
            );
            self.ensure_network(self.network.chain_id).await?;
        }

        self.write(|s| s.initialized = true);
        info!(network = self.network.name, chain_id = self.network.chain_id, "Wallet gateway initialized");
        Ok(())
    }

    /// Switch the provider to `target_chain_id`, registering the network and
    /// retrying once if the provider does not know it yet.
    ///
    /// Switching away from the target network ends any session, like a
    /// `ChainChanged` signal would.
    pub async fn ensure_network(&self, target_chain_id: u64) -> BridgeResult<()> {
        let network = if target_chain_id == self.network.chain_id {
            self.network.clone()
        } else {
            NetworkConfig::by_chain_id(target_chain_id).ok_or_else(|| {
                BridgeError::NetworkSwitchError(format!("chain {target_chain_id} is not supported"))
            })?
        };

        match self.provider.switch_chain(target_chain_id).await {
            Ok(()) => {}
            Err(ProviderError::UnrecognizedChain(_)) => {
                info!(network = network.name, chain_id = target_chain_id, "Registering network with provider");
                self.provider.add_chain(&network).await.map_err(|e| {
                    BridgeError::NetworkSwitchError(format!("could not add {}: {e}", network.name))
                })?;
                self.provider
                    .switch_chain(target_chain_id)
                    .await
                    .map_err(|e| {
                        BridgeError::NetworkSwitchError(format!(
                            "could not switch to {} after adding it: {e}",
                            network.name
                        ))
                    })?;
            }
            Err(e) => {
                return Err(BridgeError::NetworkSwitchError(format!(
                    "could not switch to {}: {e}",
                    network.name
                )));
            }
        }

        info!(chain_id = target_chain_id, "Network switched");
        if target_chain_id != self.network.chain_id {
            // Sessions only live on the target network.
            self.handle_event(ProviderEvent::ChainChanged(target_chain_id));
            return Ok(());
        }
        self.write(|s| {
            if let SessionState::Connected(session) = &mut s.session {
                session.chain_id = target_chain_id;
            }
        });
        Ok(())
    }

    /// Request account access and bind the session to the primary account.
    pub async fn connect(&self) -> BridgeResult<Address> {
        let _handshake = self.handshake.lock().await;

        if !self.is_initialized() {
            self.initialize().await?;
        }

        self.write(|s| s.session = SessionState::Connecting);

        let accounts = match self.provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                self.write(|s| s.session = SessionState::Disconnected);
                return Err(match e {
                    ProviderError::UserRejected(_) => BridgeError::NoAccounts,
                    other => BridgeError::ProviderUnavailable(other.to_string()),
                });
            }
        };

        let Some(&address) = accounts.first() else {
            self.write(|s| s.session = SessionState::Disconnected);
            warn!("Provider returned no accounts");
            return Err(BridgeError::NoAccounts);
        };

        let session = WalletSession {
            address,
            chain_id: self.network.chain_id,
            connected: true,
        };
        self.write(|s| s.session = SessionState::Connected(session));
        info!(%address, chain_id = self.network.chain_id, "Wallet connected");
        Ok(address)
    }

    /// Drop the session. The provider stays initialized.
    pub fn disconnect(&self) {
        let was = self.write(|s| std::mem::replace(&mut s.session, SessionState::Disconnected));
        if let SessionState::Connected(session) = was {
            info!(address = %session.address, "Wallet disconnected");
        }
    }

    /// Apply an unsolicited provider signal to the session.
    pub fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    warn!("Provider has no accounts left, disconnecting");
                    self.write(|s| s.session = SessionState::Disconnected);
                }
                Some(&primary) => self.write(|s| {
                    if let SessionState::Connected(session) = &mut s.session {
                        if session.address != primary {
                            info!(from = %session.address, to = %primary, "Primary account changed");
                            session.address = primary;
                        }
                    }
                }),
            },
            ProviderEvent::ChainChanged(chain_id) => {
                warn!(chain_id, "Provider network changed, session invalidated");
                self.write(|s| {
                    s.initialized = false;
                    s.session = SessionState::Disconnected;
                });
            }
        }
    }

    /// Native balance of `address` as a decimal string.
    pub async fn balance(&self, address: &str) -> BridgeResult<String> {
        Ok(self.native_balance(address).await?.balance_formatted)
    }

    /// Native balance of `address` with raw and formatted values.
    pub async fn native_balance(&self, address: &str) -> BridgeResult<NativeBalance> {
        let parsed =
            validate_address(address).map_err(|e| BridgeError::invalid_address(address, e))?;

        if !self.is_initialized() {
            self.initialize().await?;
        }

        let wei = self
            .provider
            .balance(parsed)
            .await
            .map_err(|e| BridgeError::BalanceQueryError(e.to_string()))?;

        let currency = &self.network.native_currency;
        Ok(NativeBalance {
            address: parsed.to_checksum(None),
            symbol: currency.symbol.to_string(),
            balance_raw: wei.to_string(),
            balance_formatted: format_amount(wei, currency.decimals),
        })
    }

    /// Confirm the provider is still on the session's network.
    ///
    /// A mismatch is treated like a chain-change signal.
    pub async fn verify_network(&self) -> BridgeResult<WalletSession> {
        let session = self.require_session()?;
        let actual = self
            .provider
            .chain_id()
            .await
            .map_err(|e| BridgeError::ProviderUnavailable(e.to_string()))?;
        if actual != session.chain_id {
            self.handle_event(ProviderEvent::ChainChanged(actual));
            return Err(BridgeError::WalletNotConnected);
        }
        Ok(session)
    }

    /// Current fee parameters from the active session.
    pub async fn fee_data(&self) -> BridgeResult<FeeData> {
        self.require_session()?;
        self.provider
            .fee_data()
            .await
            .map_err(|e| BridgeError::SubmissionError(e.to_string()))
    }

    /// Hand a transfer to the provider for signing and broadcast.
    pub async fn submit(&self, tx: TransferTx) -> BridgeResult<B256> {
        self.require_session()?;
        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| match e {
                ProviderError::UserRejected(msg) => BridgeError::TransactionRejected(msg),
                other => BridgeError::SubmissionError(other.to_string()),
            })
    }

    /// Receipt for `tx_hash`, or `None` if not yet included.
    pub async fn transaction_receipt(&self, tx_hash: B256) -> BridgeResult<Option<TxReceipt>> {
        self.provider
            .transaction_receipt(tx_hash)
            .await
            .map_err(|e| BridgeError::SubmissionError(e.to_string()))
    }
}
