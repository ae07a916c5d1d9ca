// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation planning.
//!
//! Turns per-server health plus freshly fetched ground truth into an ordered list
//! of add/remove actions. Planning is pure apart from [`resync_assignments`],
//! which overwrites each record's `is_assigned` flag from ground truth.
//!
//! # Rules
//!
//! - **Assign** a server iff it is healthy, unassigned, and either not primary or
//!   no healthy non-primary server exists (primary as last-resort fallback).
//! - **Unassign** an unhealthy server iff it has been unhealthy for at least the
//!   grace period, at least one server is healthy, and removing it leaves at
//!   least one published server. With no healthy server the published set is
//!   left as it is.
//! - **Demote** (unassign) a healthy primary server iff a healthy non-primary
//!   server is published or being published this cycle.
//! - Servers are evaluated in name order; all assigns precede all unassigns.

use crate::config::Server;
use crate::health::{HealthRecord, HealthStateStore};
use crate::provider::RecordSnapshot;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Direction of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Assign,
    Unassign,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Unassign => "unassign",
        }
    }
}

/// Why an action was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionReason {
    /// Healthy, eligible and not yet published
    Healthy,
    /// Primary server published because no non-primary server is healthy
    PrimaryFallback,
    /// Unhealthy for at least the grace period
    UnhealthyPastGrace,
    /// Healthy primary withdrawn because a non-primary alternative exists
    PrimaryDemotion,
}

/// One planned change to the published record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub server: Server,
    /// Provider record to delete; set for every `Unassign`
    pub record_id: Option<String>,
    pub reason: ActionReason,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.as_str(), self.server.name)
    }
}

/// Overwrite every record's `is_assigned` flag from ground truth (IP match).
///
/// Returns the number of configured servers currently published.
pub fn resync_assignments(store: &mut HealthStateStore, records: &[RecordSnapshot]) -> usize {
    let mut assigned = 0;
    for record in store.iter_mut() {
        record.is_assigned = record_id_for(&record.server, records).is_some();
        if record.is_assigned {
            assigned += 1;
        }
    }
    assigned
}

/// Compute the ordered action list for one cycle.
///
/// `store` must already be resynced against `records`. Identical inputs always
/// produce an identical list.
#[must_use]
pub fn plan_actions(
    store: &HealthStateStore,
    records: &[RecordSnapshot],
    now: DateTime<Utc>,
    grace_period: Duration,
) -> Vec<Action> {
    let healthy_non_primary_exists = store.iter().any(|r| r.is_healthy && !r.is_primary);
    let any_healthy = store.healthy_count() > 0;

    let mut assigns = Vec::new();
    for record in store.iter() {
        if !record.is_healthy || record.is_assigned {
            continue;
        }
        if record.is_primary && healthy_non_primary_exists {
            debug!(
                server = %record.server.name,
                "Primary server held back, non-primary servers are healthy"
            );
            continue;
        }
        assigns.push(Action {
            kind: ActionKind::Assign,
            server: record.server.clone(),
            record_id: None,
            reason: if record.is_primary {
                ActionReason::PrimaryFallback
            } else {
                ActionReason::Healthy
            },
        });
    }

    // A healthy non-primary server is published already or is in `assigns`
    let non_primary_published = store
        .iter()
        .any(|r| r.is_healthy && !r.is_primary && r.is_assigned)
        || assigns
            .iter()
            .any(|a| a.reason == ActionReason::Healthy);

    let mut published = store.iter().filter(|r| r.is_assigned).count() + assigns.len();
    let mut unassigns = Vec::new();

    for record in store.iter().filter(|r| r.is_assigned) {
        let reason = if record.is_healthy {
            if !(record.is_primary && non_primary_published) {
                continue;
            }
            ActionReason::PrimaryDemotion
        } else {
            if !any_healthy {
                continue;
            }
            if !grace_elapsed(record, now, grace_period) {
                debug!(
                    server = %record.server.name,
                    "Unhealthy server still within grace period"
                );
                continue;
            }
            ActionReason::UnhealthyPastGrace
        };

        if published <= 1 {
            debug!(
                server = %record.server.name,
                "Keeping last published server"
            );
            continue;
        }

        let Some(record_id) = record_id_for(&record.server, records) else {
            continue;
        };
        published -= 1;
        unassigns.push(Action {
            kind: ActionKind::Unassign,
            server: record.server.clone(),
            record_id: Some(record_id.to_string()),
            reason,
        });
    }

    assigns.extend(unassigns);
    assigns
}

fn grace_elapsed(record: &HealthRecord, now: DateTime<Utc>, grace_period: Duration) -> bool {
    let Some(since) = record.last_unhealthy_time else {
        return true;
    };
    // A timestamp in the future (clock step backwards) counts as no time elapsed
    let elapsed = (now - since).to_std().unwrap_or(Duration::ZERO);
    elapsed >= grace_period
}

fn record_id_for<'a>(server: &Server, records: &'a [RecordSnapshot]) -> Option<&'a str> {
    let ip = server.ip.to_string();
    records
        .iter()
        .find(|r| r.content == ip)
        .map(|r| r.id.as_str())
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod planner_tests;
