// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address format and checksum validation.

use std::str::FromStr;

use alloy::primitives::Address;

/// Why an address string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must be 42 characters (0x + 40 hex)")]
    InvalidLength,

    #[error("address must contain only hex characters")]
    NonHex,

    #[error("address has an invalid EIP-55 checksum")]
    BadChecksum,
}

/// Validate an EVM address.
///
/// Single-case hex (all lower or all upper) is accepted as-is. Mixed-case
/// input must carry a valid EIP-55 checksum.
pub fn validate_address(address: &str) -> Result<Address, AddressError> {
    let Some(hex) = address.strip_prefix("0x") else {
        return Err(AddressError::MissingPrefix);
    };
    if hex.len() != 40 {
        return Err(AddressError::InvalidLength);
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::NonHex);
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(address, None).map_err(|_| AddressError::BadChecksum)
    } else {
        Address::from_str(address).map_err(|_| AddressError::NonHex)
    }
}

/// Returns `true` if the string is a valid address.
pub fn is_address(address: &str) -> bool {
    validate_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn accepts_checksummed_and_single_case() {
        assert!(is_address(CHECKSUMMED));
        assert!(is_address(&CHECKSUMMED.to_lowercase()));
        assert!(is_address(&format!("0x{}", CHECKSUMMED[2..].to_uppercase())));
    }

    #[test]
    fn rejects_bad_checksum() {
        // Flip the case of one letter.
        let bad = CHECKSUMMED.replacen("aA", "Aa", 1);
        assert_eq!(validate_address(&bad), Err(AddressError::BadChecksum));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(
            validate_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(validate_address("0x1234"), Err(AddressError::InvalidLength));
        assert_eq!(
            validate_address("0x742d35Cc6635b8bCc6d6eAa5e5b1B5b5D5E5F5G5"),
            Err(AddressError::NonHex)
        );
    }
}
