// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local signer loading.
//!
//! The bridge signs with a single local key supplied by the operator, either
//! as a hex string (`SIGNER_KEY`) or as a key file (`SIGNER_KEY_FILE`) in hex
//! or PKCS#8/SEC1 PEM form.

use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use k256::SecretKey;

/// Errors raised while loading a signing key.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("failed to read key file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Create a signer from a hex private key (with or without `0x`).
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, SignerError> {
    let trimmed = private_key_hex.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let key_bytes =
        alloy::hex::decode(hex).map_err(|e| SignerError::InvalidKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))
}

/// Parse a private key from PEM format to hex string.
///
/// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, SignerError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| SignerError::InvalidKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| SignerError::InvalidKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| SignerError::InvalidKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

/// Create a signer from PEM-encoded private key.
pub fn signer_from_pem(pem_bytes: &[u8]) -> Result<PrivateKeySigner, SignerError> {
    let hex_key = pem_to_hex(pem_bytes)?;
    signer_from_hex(&hex_key)
}

/// Load a signer from a key file, detecting PEM versus hex content.
pub fn signer_from_file(path: impl AsRef<Path>) -> Result<PrivateKeySigner, SignerError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SignerError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if bytes.starts_with(b"-----BEGIN") {
        signer_from_pem(&bytes)
    } else {
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| SignerError::InvalidKey(format!("Invalid UTF-8: {}", e)))?;
        signer_from_hex(text)
    }
}
