// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider access.
//!
//! # Layers
//!
//! - [`DnsProvider`] - a single attempt of list/create/delete against the provider
//!   API, mapping transport and HTTP failures into [`ProviderError`]
//! - [`RecordClient`] - validates inputs, enforces the global call spacing, and
//!   retries transient failures on a fixed schedule
//!
//! Only [`RecordClient`] should be used by the reconciliation loop.

pub mod client;
pub mod cloudflare;
pub mod rate_limit;
pub mod retry;

pub use client::RecordClient;
pub use cloudflare::CloudflareProvider;
pub use rate_limit::RateLimiter;
pub use retry::{FixedBackoff, Retried};

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One published A record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// Opaque provider identifier
    pub id: String,
    /// IP address the record points at
    pub content: String,
    /// Owning record name
    pub name: String,
}

/// Single-attempt provider operations. No validation, spacing or retry.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List A records named `name`.
    async fn list(&self, name: &str) -> Result<Vec<RecordSnapshot>, ProviderError>;

    /// Create an A record `name -> ip`.
    async fn create(&self, name: &str, ip: &str) -> Result<RecordSnapshot, ProviderError>;

    /// Delete the record with identifier `id`.
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;
}
