// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line / environment configuration.
//!
//! Raw input is parsed by `clap` into [`Cli`] and then validated eagerly by
//! [`Config::from_cli`] into an immutable [`Config`]. The reconciliation core only
//! ever sees the validated value.
//!
//! # Example
//!
//! ```rust
//! use clap::Parser;
//! use dnssteer::config::{Cli, Config};
//!
//! let cli = Cli::parse_from([
//!     "dnssteer",
//!     "--servers", r#"[{"name":"edge-1","ip":"192.0.2.10"}]"#,
//!     "--hostname", "app.example.com",
//!     "--health-url", "https://app.example.com/healthz",
//!     "--zone-id", "023e105f4ecef8ad9ca31a8372d0c353",
//!     "--api-token", "secret",
//! ]);
//! let config = Config::from_cli(cli).unwrap();
//! assert_eq!(config.servers.len(), 1);
//! assert!(config.interval.is_none());
//! ```

use crate::constants::{
    CLOUDFLARE_AUTO_TTL, DEFAULT_CLOUDFLARE_API_BASE, DEFAULT_GRACE_PERIOD_SECS,
    DEFAULT_RECORD_TTL_SECS, MAX_RECORD_TTL_SECS, MIN_RECORD_TTL_SECS,
};
use crate::errors::ConfigError;
use crate::validation::{validate_ipv4, validate_record_id};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Raw command line arguments. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "dnssteer", version, about)]
pub struct Cli {
    /// JSON array of servers: `[{"name": "...", "ip": "..."}]`
    #[arg(long, env = "DNSSTEER_SERVERS", conflicts_with = "servers_file")]
    pub servers: Option<String>,

    /// Path to a JSON file holding the server array
    #[arg(long, env = "DNSSTEER_SERVERS_FILE")]
    pub servers_file: Option<PathBuf>,

    /// Shared virtual hostname (also the managed DNS record name)
    #[arg(long, env = "DNSSTEER_HOSTNAME")]
    pub hostname: String,

    /// Health check URL; its host is replaced by the virtual hostname
    #[arg(long, env = "DNSSTEER_HEALTH_URL")]
    pub health_url: String,

    /// Cloudflare zone identifier
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub zone_id: String,

    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Cloudflare API base URL
    #[arg(long, env = "DNSSTEER_API_BASE_URL", default_value = DEFAULT_CLOUDFLARE_API_BASE)]
    pub api_base_url: String,

    /// Seconds between cycles; run a single cycle when omitted
    #[arg(long, env = "DNSSTEER_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Seconds a server must stay unhealthy before its record is removed
    #[arg(long, env = "DNSSTEER_GRACE_PERIOD_SECS", default_value_t = DEFAULT_GRACE_PERIOD_SECS)]
    pub grace_period_secs: u64,

    /// TTL of created records (1 = provider automatic)
    #[arg(long, env = "DNSSTEER_TTL", default_value_t = DEFAULT_RECORD_TTL_SECS)]
    pub ttl: u32,

    /// Create records as proxied
    #[arg(long, env = "DNSSTEER_PROXIED", default_value_t = false)]
    pub proxied: bool,

    /// Address for the Prometheus `/metrics` endpoint
    #[arg(long, env = "DNSSTEER_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

/// A backend server, immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Server {
    /// Display key, unique across the configuration
    pub name: String,
    /// Literal address the probe connects to and the record publishes
    pub ip: Ipv4Addr,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    name: String,
    ip: String,
}

/// Provider credentials and record settings.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_base: Url,
    pub zone_id: String,
    pub api_token: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base", &self.api_base.as_str())
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configured servers in the order given
    pub servers: Vec<Server>,
    pub hostname: String,
    /// Health URL with the virtual hostname as its host
    pub health_url: Url,
    pub provider: ProviderConfig,
    /// `None` means single-shot
    pub interval: Option<Duration>,
    pub grace_period: Duration,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Validate raw CLI input into a `Config`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for the first invalid setting found.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let raw_servers = match (&cli.servers, &cli.servers_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidServerList {
                    reason: format!("cannot read {}: {e}", path.display()),
                })?
            }
            (None, None) => return Err(ConfigError::MissingServers),
        };
        let servers = parse_servers(&raw_servers)?;

        let hostname = validate_hostname(&cli.hostname)?;
        let health_url = build_health_url(&cli.health_url, &hostname)?;

        if cli.api_token.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials("API token is empty".into()));
        }
        validate_record_id(&cli.zone_id).map_err(|e| {
            ConfigError::InvalidCredentials(format!("zone id: {e}"))
        })?;
        let api_base = Url::parse(&cli.api_base_url).map_err(|e| {
            ConfigError::InvalidCredentials(format!("API base URL '{}': {e}", cli.api_base_url))
        })?;
        if cli.ttl != CLOUDFLARE_AUTO_TTL
            && !(MIN_RECORD_TTL_SECS..=MAX_RECORD_TTL_SECS).contains(&cli.ttl)
        {
            return Err(ConfigError::InvalidTtl {
                ttl: cli.ttl,
                auto: CLOUDFLARE_AUTO_TTL,
                min: MIN_RECORD_TTL_SECS,
                max: MAX_RECORD_TTL_SECS,
            });
        }

        let interval = match cli.interval_secs {
            Some(0) => return Err(ConfigError::InvalidInterval),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            servers,
            hostname,
            health_url,
            provider: ProviderConfig {
                api_base,
                zone_id: cli.zone_id,
                api_token: cli.api_token,
                ttl: cli.ttl,
                proxied: cli.proxied,
            },
            interval,
            grace_period: Duration::from_secs(cli.grace_period_secs),
            metrics_addr: cli.metrics_addr,
        })
    }
}

/// Parse and validate the JSON server list.
///
/// # Errors
///
/// Returns a `ConfigError` on malformed JSON, an empty list, an invalid entry,
/// or a duplicated name or address.
pub fn parse_servers(raw: &str) -> Result<Vec<Server>, ConfigError> {
    let entries: Vec<ServerEntry> =
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidServerList {
            reason: e.to_string(),
        })?;
    if entries.is_empty() {
        return Err(ConfigError::NoServers);
    }

    let mut names = HashSet::new();
    let mut ips = HashSet::new();
    let mut servers = Vec::with_capacity(entries.len());

    for entry in entries {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::InvalidServer {
                name,
                reason: "name is empty".into(),
            });
        }
        validate_ipv4(&entry.ip).map_err(|e| ConfigError::InvalidServer {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let ip: Ipv4Addr = entry.ip.parse().map_err(|e| ConfigError::InvalidServer {
            name: name.clone(),
            reason: format!("{e}"),
        })?;

        if !names.insert(name.clone()) {
            return Err(ConfigError::DuplicateServer {
                field: "name",
                value: name,
            });
        }
        if !ips.insert(ip) {
            return Err(ConfigError::DuplicateServer {
                field: "ip",
                value: ip.to_string(),
            });
        }
        servers.push(Server { name, ip });
    }

    Ok(servers)
}

fn validate_hostname(raw: &str) -> Result<String, ConfigError> {
    let hostname = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };
    if hostname.is_empty() || hostname.len() > 253 || !hostname.split('.').all(valid_label) {
        return Err(ConfigError::InvalidHostname(raw.to_string()));
    }
    Ok(hostname)
}

fn build_health_url(raw: &str, hostname: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHealthUrl {
        url: raw.to_string(),
        reason,
    };
    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    url.set_host(Some(hostname))
        .map_err(|e| invalid(e.to_string()))?;
    Ok(url)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
