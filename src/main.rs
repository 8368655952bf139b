// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cryptap_bridge::{
    api::router,
    blockchain::{
        signing::{signer_from_file, signer_from_hex, SignerError},
        RpcWalletProvider,
    },
    bridge::Bridge,
    config::{BridgeConfig, SignerSource},
    logging::init_logging,
    state::AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Bridge server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = BridgeConfig::from_env();

    let signer = load_signer(config.signer.as_ref())
        .map_err(|e| format!("Failed to load signing key: {e}"))?;
    if signer.is_none() {
        warn!("No signing key configured; wallet will expose no accounts");
    }

    let provider = RpcWalletProvider::new(config.network.clone(), config.rpc_url.as_deref(), signer)
        .map_err(|e| format!("Failed to create wallet provider: {e}"))?;
    let bridge = Arc::new(
        Bridge::open(&config, Arc::new(provider))
            .map_err(|e| format!("Failed to open bridge state: {e}"))?,
    );

    bridge.resume_pending();

    let app = router(AppState::new(bridge.clone()));
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    info!(
        %addr,
        network = config.network.name,
        chain_id = config.network.chain_id,
        "CrypTap bridge listening (docs at /docs)"
    );

    let shutdown = bridge.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| format!("Server error: {e}"))?;

    bridge.shutdown().await;
    Ok(())
}

fn load_signer(source: Option<&SignerSource>) -> Result<Option<PrivateKeySigner>, SignerError> {
    match source {
        Some(SignerSource::Inline(hex)) => signer_from_hex(hex).map(Some),
        Some(SignerSource::File(path)) => signer_from_file(path).map(Some),
        None => Ok(None),
    }
}

/// Resolves on Ctrl+C or when the bridge is shut down from elsewhere.
async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                token.cancelled().await;
            }
            info!("Received Ctrl+C, shutting down");
        }
        _ = token.cancelled() => {}
    }
}
