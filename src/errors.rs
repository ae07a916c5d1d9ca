// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for dnssteer.
//!
//! This module provides specialized error types for:
//! - Configuration and credential validation (fatal, before the first cycle)
//! - DNS provider operations (list/create/delete), including the retry policy
//!
//! Orchestration code wraps these in `anyhow::Error` with added context; the
//! typed variants stay available through `downcast_ref` where the retry policy
//! or exit-code selection needs them.

use thiserror::Error;

/// Errors raised while turning raw CLI/env input into a validated `Config`.
///
/// Any of these terminates the process before the first reconciliation cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No servers were configured
    #[error("at least one server must be configured")]
    NoServers,

    /// Neither an inline server list nor a server file was provided
    #[error("one of --servers or --servers-file is required")]
    MissingServers,

    /// The server list could not be read or parsed
    #[error("invalid server list: {reason}")]
    InvalidServerList {
        /// Parse or I/O failure description
        reason: String,
    },

    /// A server entry has an empty name or malformed IPv4 address
    #[error("invalid server '{name}': {reason}")]
    InvalidServer {
        /// The offending server name (may be empty)
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Two server entries share a name or an address
    #[error("duplicate server {field} '{value}'")]
    DuplicateServer {
        /// `name` or `ip`
        field: &'static str,
        /// The duplicated value
        value: String,
    },

    /// Virtual hostname is empty or malformed
    #[error("invalid hostname '{0}'")]
    InvalidHostname(String),

    /// Health check URL could not be parsed or uses an unsupported scheme
    #[error("invalid health check URL '{url}': {reason}")]
    InvalidHealthUrl {
        /// The URL as given
        url: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Provider credentials or zone identifier are missing or malformed
    #[error("invalid provider credentials: {0}")]
    InvalidCredentials(String),

    /// Record TTL is neither automatic nor within the accepted range
    #[error("invalid ttl {ttl}: must be {auto} (automatic) or between {min} and {max} seconds")]
    InvalidTtl { ttl: u32, auto: u32, min: u32, max: u32 },

    /// Interval must be strictly positive when given
    #[error("interval must be greater than zero")]
    InvalidInterval,
}

/// Errors that can occur while talking to the DNS provider.
///
/// Variants are split along the retry policy: rate limiting, 5xx, timeouts and
/// connection failures are transient; everything else fails fast.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Input rejected locally before any network call
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// Which input failed (`ip`, `record id`)
        field: &'static str,
        /// The rejected value
        value: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Request exceeded the provider timeout
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider operation (`list`, `create`, `delete`)
        operation: &'static str,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Connection could not be established or was reset
    #[error("{operation} connection failed: {reason}")]
    Connection {
        /// Provider operation
        operation: &'static str,
        /// Transport failure description
        reason: String,
    },

    /// HTTP 429 or a provider-specific throttling error code
    #[error("{operation} rate limited (HTTP {status}): {message}")]
    RateLimited {
        /// Provider operation
        operation: &'static str,
        /// HTTP status code of the response
        status: u16,
        /// Provider message
        message: String,
    },

    /// HTTP 5xx
    #[error("{operation} failed with server error (HTTP {status}): {message}")]
    Server {
        /// Provider operation
        operation: &'static str,
        /// HTTP status code (500-599)
        status: u16,
        /// Provider message
        message: String,
    },

    /// Any other provider rejection (4xx other than 429, or `success=false`)
    #[error("{operation} rejected by provider (HTTP {status}): {message}")]
    Api {
        /// Provider operation
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Provider message
        message: String,
    },

    /// Response body could not be decoded
    #[error("{operation} returned an unreadable response: {reason}")]
    Decode {
        /// Provider operation
        operation: &'static str,
        /// Decode failure description
        reason: String,
    },

    /// A retryable failure persisted through every attempt
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Provider operation
        operation: &'static str,
        /// Total attempts made
        attempts: u32,
        /// The final failure
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether the retry policy allows another attempt after this failure.
    ///
    /// # Retryable
    ///
    /// - **RateLimited** - HTTP 429 or provider throttling code
    /// - **Server** - HTTP 5xx
    /// - **Timeout** / **Connection** - transport failures
    ///
    /// Everything else, including an already exhausted retry, is final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Server { .. }
                | Self::Timeout { .. }
                | Self::Connection { .. }
        )
    }

    /// Classify an HTTP error status into the matching variant.
    #[must_use]
    pub fn from_status(operation: &'static str, status: u16, message: String) -> Self {
        match status {
            429 => Self::RateLimited {
                operation,
                status,
                message,
            },
            500..=599 => Self::Server {
                operation,
                status,
                message,
            },
            _ => Self::Api {
                operation,
                status,
                message,
            },
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
