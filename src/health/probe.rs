// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health probing against a server's literal address.
//!
//! Each probe connects to the server's IP while presenting the shared virtual
//! hostname, both as TLS SNI and as the HTTP `Host` header. This is done by
//! pinning the hostname to the server's address in a per-server `reqwest`
//! client, so name resolution of the virtual hostname is never consulted.
//!
//! Certificates are not verified: the target is reached by address, not by a
//! trusted name.
//!
//! # Classification
//!
//! | Outcome                          | healthy | primary            |
//! |----------------------------------|---------|--------------------|
//! | HTTP 200                         | `true`  | from payload flag  |
//! | any other status                 | `false` | `false`            |
//! | timeout / transport error        | `false` | `false`            |

use crate::config::Server;
use crate::constants::{PRIMARY_FLAG_KEYS, PROBE_TIMEOUT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::{debug, warn};
use url::Url;

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub healthy: bool,
    pub is_primary: bool,
}

impl ProbeResult {
    /// An unhealthy, non-primary result.
    #[must_use]
    pub const fn unhealthy() -> Self {
        Self {
            healthy: false,
            is_primary: false,
        }
    }
}

/// A single connectivity check against one server.
///
/// Implementations never retry and never fail: any problem is reported as an
/// unhealthy result and corrected on a later cycle.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, server: &Server) -> ProbeResult;
}

/// HTTP(S) probe presenting the virtual hostname to each server's address.
pub struct HttpsProbe {
    url: Url,
    clients: HashMap<Ipv4Addr, HttpClient>,
}

impl HttpsProbe {
    /// Build one pinned client per configured server.
    ///
    /// `url` must already carry the virtual hostname as its host.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no host or a client cannot be built.
    pub fn new(url: Url, servers: &[Server]) -> Result<Self> {
        Self::with_timeout(url, servers, PROBE_TIMEOUT)
    }

    /// Like [`HttpsProbe::new`] with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no host or a client cannot be built.
    pub fn with_timeout(url: Url, servers: &[Server], timeout: std::time::Duration) -> Result<Self> {
        let hostname = url
            .host_str()
            .context("health check URL has no host")?
            .to_string();
        let port = url
            .port_or_known_default()
            .context("health check URL has no port")?;

        let mut clients = HashMap::with_capacity(servers.len());
        for server in servers {
            let client = HttpClient::builder()
                .resolve(&hostname, SocketAddr::new(IpAddr::V4(server.ip), port))
                .danger_accept_invalid_certs(true)
                .timeout(timeout)
                .build()
                .with_context(|| format!("Failed to build probe client for {}", server.name))?;
            clients.insert(server.ip, client);
        }

        Ok(Self { url, clients })
    }
}

#[async_trait]
impl Probe for HttpsProbe {
    async fn probe(&self, server: &Server) -> ProbeResult {
        let Some(client) = self.clients.get(&server.ip) else {
            debug!(server = %server.name, "No probe client for server");
            return ProbeResult::unhealthy();
        };

        let response = match client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    server = %server.name,
                    ip = %server.ip,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Health probe failed"
                );
                return ProbeResult::unhealthy();
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(server = %server.name, error = %e, "Failed to read health response body");
                return ProbeResult::unhealthy();
            }
        };

        let result = classify(status, &body);
        if !result.healthy {
            warn!(
                server = %server.name,
                ip = %server.ip,
                status = status.as_u16(),
                "Health probe returned non-200 status"
            );
            return result;
        }
        debug!(
            server = %server.name,
            status = status.as_u16(),
            healthy = result.healthy,
            primary = result.is_primary,
            "Health probe completed"
        );
        result
    }
}

/// Classify a health response.
///
/// Only HTTP 200 is healthy. The primary flag is read from the JSON body;
/// a missing or unreadable flag means "not primary".
#[must_use]
pub fn classify(status: StatusCode, body: &[u8]) -> ProbeResult {
    if status != StatusCode::OK {
        return ProbeResult::unhealthy();
    }
    ProbeResult {
        healthy: true,
        is_primary: primary_flag(body),
    }
}

fn primary_flag(body: &[u8]) -> bool {
    let Ok(Value::Object(payload)) = serde_json::from_slice::<Value>(body) else {
        return false;
    };
    PRIMARY_FLAG_KEYS
        .iter()
        .find_map(|key| payload.get(*key))
        .is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod probe_tests;
