// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 DNS records API.
//!
//! Endpoints used:
//!
//! | Operation | Request                                                       |
//! |-----------|---------------------------------------------------------------|
//! | list      | `GET /zones/{zone}/dns_records?type=A&name={name}&per_page=N` |
//! | create    | `POST /zones/{zone}/dns_records`                              |
//! | delete    | `DELETE /zones/{zone}/dns_records/{id}`                       |
//!
//! Every response is wrapped in the `{success, errors, result}` envelope. A
//! `success=false` body carrying a throttling error code is treated as rate
//! limiting even when the HTTP status is not 429.

use super::{DnsProvider, RecordSnapshot};
use crate::config::ProviderConfig;
use crate::constants::{
    CLOUDFLARE_RATE_LIMIT_CODES, LIST_PAGE_SIZE, PROVIDER_REQUEST_TIMEOUT, RECORD_TYPE_A,
};
use crate::errors::ProviderError;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// Cloudflare implementation of [`DnsProvider`].
#[derive(Clone)]
pub struct CloudflareProvider {
    http: HttpClient,
    records_url: String,
    api_token: String,
    ttl: u32,
    proxied: bool,
}

impl CloudflareProvider {
    /// Create a provider for the configured zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(PROVIDER_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            records_url: format!(
                "{}/zones/{}/dns_records",
                config.api_base.as_str().trim_end_matches('/'),
                config.zone_id
            ),
            api_token: config.api_token.clone(),
            ttl: config.ttl,
            proxied: config.proxied,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ProviderError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        debug!(
            operation = operation,
            status = status.as_u16(),
            bytes = body.len(),
            "Cloudflare API response"
        );

        let envelope: Option<Envelope<T>> = serde_json::from_slice(&body).ok();

        if !status.is_success() {
            let message = envelope
                .as_ref()
                .map(|env| join_messages(&env.errors))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            if envelope.as_ref().is_some_and(|env| has_rate_limit_code(&env.errors)) {
                return Err(ProviderError::RateLimited {
                    operation,
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(ProviderError::from_status(operation, status.as_u16(), message));
        }

        let envelope = envelope.ok_or_else(|| ProviderError::Decode {
            operation,
            reason: format!(
                "unexpected body: {}",
                String::from_utf8_lossy(&body).chars().take(200).collect::<String>()
            ),
        })?;

        if !envelope.success {
            let message = join_messages(&envelope.errors);
            if has_rate_limit_code(&envelope.errors) {
                return Err(ProviderError::RateLimited {
                    operation,
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(ProviderError::Api {
                operation,
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list(&self, name: &str) -> Result<Vec<RecordSnapshot>, ProviderError> {
        let mut url = Url::parse(&self.records_url).map_err(|e| ProviderError::Validation {
            field: "records url",
            value: self.records_url.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("type", RECORD_TYPE_A)
            .append_pair("name", name)
            .append_pair("per_page", &LIST_PAGE_SIZE.to_string());
        let request = self.http.get(url);
        let records: Option<Vec<RecordSnapshot>> = self.execute("list", request).await?;
        Ok(records.unwrap_or_default())
    }

    async fn create(&self, name: &str, ip: &str) -> Result<RecordSnapshot, ProviderError> {
        let body = CreateRecordRequest {
            record_type: RECORD_TYPE_A,
            name,
            content: ip,
            ttl: self.ttl,
            proxied: self.proxied,
        };
        let request = self.http.post(&self.records_url).json(&body);
        self.execute("create", request)
            .await?
            .ok_or_else(|| ProviderError::Decode {
                operation: "create",
                reason: "response has no result".into(),
            })
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let request = self.http.delete(format!("{}/{id}", self.records_url));
        self.execute::<serde_json::Value>("delete", request).await?;
        Ok(())
    }
}

fn transport_error(operation: &'static str, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            operation,
            timeout_ms: u64::try_from(PROVIDER_REQUEST_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        ProviderError::Connection {
            operation,
            reason: err.to_string(),
        }
    }
}

fn has_rate_limit_code(errors: &[ApiMessage]) -> bool {
    errors
        .iter()
        .any(|e| CLOUDFLARE_RATE_LIMIT_CODES.contains(&e.code))
}

fn join_messages(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
