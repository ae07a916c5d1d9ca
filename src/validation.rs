// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Input validation performed before any provider call.
//!
//! Malformed addresses and record identifiers fail locally with a
//! [`ProviderError::Validation`] and never reach the network.

use crate::constants::CLOUDFLARE_ID_LEN;
use crate::errors::ProviderError;

/// Validate an IPv4 literal: four dot-separated decimal octets, each 0-255,
/// with no leading zeros.
///
/// This is stricter than `std::net::Ipv4Addr::from_str` in spirit: `"010.0.0.1"`
/// is rejected, and so is anything with whitespace, signs or empty octets.
///
/// # Errors
///
/// Returns `ProviderError::Validation` describing the first offending octet.
///
/// # Example
///
/// ```rust
/// use dnssteer::validation::validate_ipv4;
///
/// assert!(validate_ipv4("192.0.2.1").is_ok());
/// assert!(validate_ipv4("192.0.2.01").is_err());
/// assert!(validate_ipv4("256.0.0.1").is_err());
/// ```
pub fn validate_ipv4(ip: &str) -> Result<(), ProviderError> {
    let invalid = |reason: String| ProviderError::Validation {
        field: "ip",
        value: ip.to_string(),
        reason,
    };

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(invalid(format!("expected 4 octets, found {}", octets.len())));
    }

    for octet in octets {
        if octet.is_empty() || octet.len() > 3 {
            return Err(invalid(format!("octet '{octet}' must be 1-3 digits")));
        }
        if !octet.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("octet '{octet}' is not decimal")));
        }
        if octet.len() > 1 && octet.starts_with('0') {
            return Err(invalid(format!("octet '{octet}' has a leading zero")));
        }
        // At most 3 ASCII digits, so this cannot overflow u16
        let value: u16 = octet
            .parse()
            .map_err(|_| invalid(format!("octet '{octet}' is not decimal")))?;
        if value > 255 {
            return Err(invalid(format!("octet '{octet}' is out of range 0-255")));
        }
    }

    Ok(())
}

/// Validate a provider record identifier (32 lowercase hexadecimal characters).
///
/// # Errors
///
/// Returns `ProviderError::Validation` if the id has the wrong length or alphabet.
pub fn validate_record_id(id: &str) -> Result<(), ProviderError> {
    if id.len() != CLOUDFLARE_ID_LEN {
        return Err(ProviderError::Validation {
            field: "record id",
            value: id.to_string(),
            reason: format!("expected {CLOUDFLARE_ID_LEN} characters, found {}", id.len()),
        });
    }
    if !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ProviderError::Validation {
            field: "record id",
            value: id.to_string(),
            reason: "must be lowercase hexadecimal".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
