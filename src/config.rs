// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the ledger and mapping blobs | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `BRIDGE_NETWORK` | Target network (`polygon` or `amoy`) | `polygon` |
//! | `RPC_URL` | RPC endpoint override for the target network | network default |
//! | `SIGNER_KEY` | Hex private key of the paying account | unset |
//! | `SIGNER_KEY_FILE` | Path to a hex or PEM private key | unset |
//! | `CONFIRMATION_DELAY_SECS` | Delay before the first confirmation check | `30` |
//! | `CONFIRMATION_MAX_ATTEMPTS` | Confirmation checks before giving up | `5` |
//! | `INCLUSION_TIMEOUT_SECS` | Bound on the wait for inclusion | `120` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::blockchain::{NetworkConfig, POLYGON_MAINNET};
use crate::confirmation_poller::{PollerConfig, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::executor::DEFAULT_INCLUSION_TIMEOUT;
use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Target network key, see [`NetworkConfig::by_key`].
pub const NETWORK_ENV: &str = "BRIDGE_NETWORK";

pub const RPC_URL_ENV: &str = "RPC_URL";

/// Hex private key of the local signer. Takes precedence over the key file.
pub const SIGNER_KEY_ENV: &str = "SIGNER_KEY";

pub const SIGNER_KEY_FILE_ENV: &str = "SIGNER_KEY_FILE";

pub const CONFIRMATION_DELAY_ENV: &str = "CONFIRMATION_DELAY_SECS";
pub const CONFIRMATION_ATTEMPTS_ENV: &str = "CONFIRMATION_MAX_ATTEMPTS";
pub const INCLUSION_TIMEOUT_ENV: &str = "INCLUSION_TIMEOUT_SECS";

/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Where the signing key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerSource {
    /// Hex key given inline
    Inline(String),
    /// Path to a hex or PEM key file
    File(PathBuf),
}

/// Bridge settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub network: NetworkConfig,
    pub rpc_url: Option<String>,
    pub signer: Option<SignerSource>,
    pub poller: PollerConfig,
    pub inclusion_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DATA_ROOT),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            network: POLYGON_MAINNET,
            rpc_url: None,
            signer: None,
            poller: PollerConfig::default(),
            inclusion_timeout: DEFAULT_INCLUSION_TIMEOUT,
        }
    }
}

impl BridgeConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let network = match get(NETWORK_ENV) {
            Some(key) => NetworkConfig::by_key(&key).unwrap_or_else(|| {
                warn!(value = %key, "Unknown {NETWORK_ENV}, using {}", defaults.network.name);
                defaults.network.clone()
            }),
            None => defaults.network.clone(),
        };

        let signer = get(SIGNER_KEY_ENV)
            .map(SignerSource::Inline)
            .or_else(|| get(SIGNER_KEY_FILE_ENV).map(|p| SignerSource::File(PathBuf::from(p))));

        let poller = PollerConfig {
            initial_delay: Duration::from_secs(parse_or(
                get(CONFIRMATION_DELAY_ENV),
                CONFIRMATION_DELAY_ENV,
                DEFAULT_INITIAL_DELAY.as_secs(),
            )),
            max_attempts: parse_or(
                get(CONFIRMATION_ATTEMPTS_ENV),
                CONFIRMATION_ATTEMPTS_ENV,
                DEFAULT_MAX_ATTEMPTS,
            )
            .max(1),
            ..PollerConfig::default()
        };

        Self {
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port: parse_or(get(PORT_ENV), PORT_ENV, defaults.port),
            network,
            rpc_url: get(RPC_URL_ENV),
            signer,
            poller,
            inclusion_timeout: Duration::from_secs(parse_or(
                get(INCLUSION_TIMEOUT_ENV),
                INCLUSION_TIMEOUT_ENV,
                defaults.inclusion_timeout.as_secs(),
            )),
        }
    }

    /// `host:port` bind string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    value: Option<String>,
    key: &str,
    default: T,
) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%key, value = %raw, %default, "Invalid value, using default");
            default
        }),
        None => default,
    }
}
