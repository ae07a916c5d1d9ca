// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-server health state.
//!
//! The store is created once at startup with one record per configured server and
//! is owned exclusively by the reconciliation loop. Records are kept ordered by
//! server name so every traversal is deterministic.

use super::probe::ProbeResult;
use crate::config::Server;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// Health of one server as tracked across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub server: Server,
    pub is_healthy: bool,
    /// Latest role flag from the probe; never debounced
    pub is_primary: bool,
    pub last_healthy_time: Option<DateTime<Utc>>,
    pub last_unhealthy_time: Option<DateTime<Utc>>,
    /// Re-derived from ground truth at the start of every plan
    pub is_assigned: bool,
}

impl HealthRecord {
    /// A freshly created record: unhealthy since `created_at`, unassigned.
    #[must_use]
    pub fn new(server: Server, created_at: DateTime<Utc>) -> Self {
        Self {
            server,
            is_healthy: false,
            is_primary: false,
            last_healthy_time: None,
            last_unhealthy_time: Some(created_at),
            is_assigned: false,
        }
    }
}

/// Health transition observed by [`HealthStateStore::update_health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameHealthy,
    BecameUnhealthy,
    Unchanged,
}

/// All health records, keyed and ordered by server name.
#[derive(Debug, Clone, Default)]
pub struct HealthStateStore {
    records: BTreeMap<String, HealthRecord>,
}

impl HealthStateStore {
    /// Create one record per server.
    ///
    /// Grace-period history does not survive a restart: every server starts as
    /// unhealthy since `now`.
    #[must_use]
    pub fn new(servers: &[Server], now: DateTime<Utc>) -> Self {
        let records = servers
            .iter()
            .map(|server| (server.name.clone(), HealthRecord::new(server.clone(), now)))
            .collect();
        Self { records }
    }

    /// Apply a probe result. Timestamps change only on edges; the primary flag
    /// is always overwritten.
    ///
    /// Returns `None` if `name` is not a configured server.
    pub fn update_health(
        &mut self,
        name: &str,
        probe: ProbeResult,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        let record = self.records.get_mut(name)?;
        record.is_primary = probe.is_primary;

        let transition = match (record.is_healthy, probe.healthy) {
            (false, true) => {
                record.is_healthy = true;
                record.last_healthy_time = Some(now);
                Transition::BecameHealthy
            }
            (true, false) => {
                record.is_healthy = false;
                record.last_unhealthy_time = Some(now);
                Transition::BecameUnhealthy
            }
            _ => Transition::Unchanged,
        };

        match transition {
            Transition::BecameHealthy => {
                info!(server = %name, ip = %record.server.ip, "Server became healthy");
            }
            Transition::BecameUnhealthy => {
                info!(server = %name, ip = %record.server.ip, "Server became unhealthy");
            }
            Transition::Unchanged => {}
        }

        Some(transition)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HealthRecord> {
        self.records.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut HealthRecord> {
        self.records.get_mut(name)
    }

    /// Records in server-name order.
    pub fn iter(&self) -> impl Iterator<Item = &HealthRecord> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HealthRecord> {
        self.records.values_mut()
    }

    /// Configured servers in name order.
    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.records.values().map(|r| &r.server)
    }

    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.iter().filter(|r| r.is_healthy).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
