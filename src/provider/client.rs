// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rate-limited, retrying access to the DNS provider.
//!
//! [`RecordClient`] is constructed once and shared by reference. Every call:
//!
//! 1. validates its input locally (no network round-trip on malformed input)
//! 2. waits for the process-wide spacing window before each attempt
//! 3. retries transient failures on the fixed `1s, 2s, 4s, 8s` schedule
//!
//! Success after retries is returned as [`Retried`] with `attempts > 1`;
//! exhaustion is a `ProviderError::Exhausted`.

use super::rate_limit::RateLimiter;
use super::retry::{provider_backoff, retry_provider_call, FixedBackoff, Retried};
use super::{DnsProvider, RecordSnapshot};
use crate::constants::PROVIDER_MIN_CALL_SPACING;
use crate::errors::ProviderError;
use crate::validation::{validate_ipv4, validate_record_id};
use std::time::Duration;

/// Validating, spacing, retrying wrapper around a [`DnsProvider`].
pub struct RecordClient<P> {
    provider: P,
    record_name: String,
    limiter: RateLimiter,
    backoff: FixedBackoff,
}

impl<P: DnsProvider> RecordClient<P> {
    /// Create a client managing A records named `record_name`.
    #[must_use]
    pub fn new(provider: P, record_name: impl Into<String>) -> Self {
        Self::with_policy(
            provider,
            record_name,
            PROVIDER_MIN_CALL_SPACING,
            provider_backoff(),
        )
    }

    /// Create a client with an explicit call spacing and retry schedule.
    #[must_use]
    pub fn with_policy(
        provider: P,
        record_name: impl Into<String>,
        spacing: Duration,
        backoff: FixedBackoff,
    ) -> Self {
        Self {
            provider,
            record_name: record_name.into(),
            limiter: RateLimiter::new(spacing),
            backoff,
        }
    }

    /// The managed record name.
    #[must_use]
    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// List the A records named `name`.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable `ProviderError` or `ProviderError::Exhausted`.
    pub async fn list(&self, name: &str) -> Result<Retried<Vec<RecordSnapshot>>, ProviderError> {
        retry_provider_call("list", name, self.backoff.clone(), || async move {
            let _permit = self.limiter.acquire().await;
            self.provider.list(name).await
        })
        .await
    }

    /// Publish `ip` under the managed record name.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Validation` for a malformed address without
    /// contacting the provider, otherwise as [`RecordClient::list`].
    pub async fn create(&self, ip: &str) -> Result<Retried<RecordSnapshot>, ProviderError> {
        validate_ipv4(ip)?;
        retry_provider_call("create", ip, self.backoff.clone(), || async move {
            let _permit = self.limiter.acquire().await;
            self.provider.create(&self.record_name, ip).await
        })
        .await
    }

    /// Remove the record with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Validation` for a malformed id without
    /// contacting the provider, otherwise as [`RecordClient::list`].
    pub async fn delete(&self, id: &str) -> Result<Retried<()>, ProviderError> {
        validate_record_id(id)?;
        retry_provider_call("delete", id, self.backoff.clone(), || async move {
            let _permit = self.limiter.acquire().await;
            self.provider.delete(id).await
        })
        .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
