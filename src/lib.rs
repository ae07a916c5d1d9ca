// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # dnssteer - health-driven DNS failover
//!
//! dnssteer keeps the A records of a shared virtual hostname in sync with the live
//! health of a fixed group of backend servers. Healthy servers are published,
//! unhealthy ones are withdrawn after a grace period, and at least one address
//! always stays published.
//!
//! ## Overview
//!
//! Each reconciliation cycle:
//!
//! 1. probes every server concurrently, presenting the virtual hostname
//! 2. applies edge-triggered health transitions
//! 3. fetches the provider's current records (ground truth)
//! 4. plans a minimal, ordered list of add/remove actions
//! 5. applies them through a rate-limited, retrying provider client
//!
//! ## Modules
//!
//! - [`config`] - CLI/env parsing and eager validation
//! - [`health`] - health probing and per-server state
//! - [`planner`] - the reconciliation decision rules
//! - [`provider`] - DNS provider access (Cloudflare), spacing and retry
//! - [`reconciler`] - the cycle driver and ticking loop
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnssteer::clock::SystemClock;
//! use dnssteer::health::{HealthStateStore, HttpsProbe};
//! use dnssteer::provider::{CloudflareProvider, RecordClient};
//! use dnssteer::reconciler::Reconciler;
//! use std::sync::Arc;
//!
//! # async fn example(config: dnssteer::config::Config) -> anyhow::Result<()> {
//! let probe = HttpsProbe::new(config.health_url.clone(), &config.servers)?;
//! let provider = CloudflareProvider::new(&config.provider)?;
//! let client = Arc::new(RecordClient::new(provider, config.hostname.clone()));
//! let clock = Arc::new(SystemClock);
//!
//! let mut reconciler = Reconciler::new(
//!     HealthStateStore::new(&config.servers, chrono::Utc::now()),
//!     Arc::new(probe),
//!     client,
//!     clock,
//!     config.grace_period,
//! );
//! let summary = reconciler.run_cycle().await?;
//! println!("published: {:?}", summary.published);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod planner;
pub mod provider;
pub mod reconciler;
pub mod validation;

#[cfg(test)]
mod testing;
