// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes shared by unit tests.

use crate::config::Server;
use crate::errors::ProviderError;
use crate::health::{Probe, ProbeResult};
use crate::provider::{DnsProvider, RecordSnapshot};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::Mutex;
use tokio::time::Instant;

pub fn server(name: &str, last_octet: u8) -> Server {
    Server {
        name: name.to_string(),
        ip: Ipv4Addr::new(192, 0, 2, last_octet),
    }
}

pub fn record_id(n: u64) -> String {
    format!("{n:032x}")
}

pub fn snapshot(n: u64, ip: &str) -> RecordSnapshot {
    RecordSnapshot {
        id: record_id(n),
        content: ip.to_string(),
        name: "app.example.com".to_string(),
    }
}

/// One call observed by [`FakeProvider`].
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: &'static str,
    pub arg: String,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct FakeState {
    records: Vec<RecordSnapshot>,
    next_id: u64,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    calls: Vec<Call>,
}

/// A provider holding records in memory with scripted failures.
#[derive(Debug, Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn with_records(records: Vec<RecordSnapshot>) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.state.lock().unwrap();
            state.next_id = 1000;
            state.records = records;
        }
        provider
    }

    /// Queue a failure for the next call of `operation`.
    pub fn fail_next(&self, operation: &'static str, err: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub fn records(&self) -> Vec<RecordSnapshot> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn published_ips(&self) -> Vec<String> {
        let mut ips: Vec<_> = self.records().into_iter().map(|r| r.content).collect();
        ips.sort();
        ips
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<(&'static str, String)> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation != "list")
            .map(|c| (c.operation, c.arg))
            .collect()
    }

    fn begin(&self, operation: &'static str, arg: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            operation,
            arg: arg.to_string(),
            at: Instant::now(),
        });
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DnsProvider for FakeProvider {
    async fn list(&self, name: &str) -> Result<Vec<RecordSnapshot>, ProviderError> {
        self.begin("list", name)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }

    async fn create(&self, name: &str, ip: &str) -> Result<RecordSnapshot, ProviderError> {
        self.begin("create", ip)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = RecordSnapshot {
            id: record_id(state.next_id),
            content: ip.to_string(),
            name: name.to_string(),
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        self.begin("delete", id)?;
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(ProviderError::from_status(
                "delete",
                404,
                format!("record {id} not found"),
            ));
        }
        Ok(())
    }
}

/// A probe returning scripted results per server name (unhealthy by default).
#[derive(Debug, Default)]
pub struct FakeProbe {
    results: Mutex<HashMap<String, ProbeResult>>,
}

impl FakeProbe {
    pub fn set(&self, name: &str, healthy: bool, is_primary: bool) {
        self.results.lock().unwrap().insert(
            name.to_string(),
            ProbeResult {
                healthy,
                is_primary,
            },
        );
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn probe(&self, server: &Server) -> ProbeResult {
        self.results
            .lock()
            .unwrap()
            .get(&server.name)
            .copied()
            .unwrap_or_default()
    }
}
