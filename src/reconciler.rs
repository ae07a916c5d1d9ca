// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The reconciliation loop.
//!
//! One cycle is: probe every server concurrently, apply health transitions,
//! fetch ground truth, plan, then apply actions one at a time. Cycles never
//! overlap; the next one is armed only after the previous one has completed.
//!
//! # Failure handling
//!
//! - Ground truth unavailable: the cycle stops before planning, nothing is changed.
//! - One action fails: it is logged and the rest of the batch still applies.
//!   Unfinished work is re-derived from ground truth on the next cycle.
//! - An unassign is skipped if it would empty a non-empty record set, which can
//!   happen when an assign it relied on failed earlier in the batch.

use crate::clock::Clock;
use crate::errors::ProviderError;
use crate::health::{HealthStateStore, Probe};
use crate::metrics;
use crate::planner::{plan_actions, resync_assignments, Action, ActionKind};
use crate::provider::{DnsProvider, RecordClient};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Healthy servers, by name
    pub healthy: Vec<String>,
    /// Servers reporting the primary role, by name
    pub primary: Vec<String>,
    /// Configured servers published at the end of the cycle, by name
    pub published: Vec<String>,
    pub planned: Vec<Action>,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Owns the health state and drives reconciliation cycles.
pub struct Reconciler<P> {
    store: HealthStateStore,
    probe: Arc<dyn Probe>,
    client: Arc<RecordClient<P>>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
}

impl<P: DnsProvider> Reconciler<P> {
    #[must_use]
    pub fn new(
        store: HealthStateStore,
        probe: Arc<dyn Probe>,
        client: Arc<RecordClient<P>>,
        clock: Arc<dyn Clock>,
        grace_period: Duration,
    ) -> Self {
        Self {
            store,
            probe,
            client,
            clock,
            grace_period,
        }
    }

    /// Current health state.
    #[must_use]
    pub fn store(&self) -> &HealthStateStore {
        &self.store
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// With no `interval` exactly one cycle runs. Otherwise the next cycle starts
    /// `interval` after the previous one finished. Shutdown is only observed
    /// between cycles; a cycle in progress always runs to completion.
    ///
    /// `shutdown` is polled once before the first cycle so that signal handlers
    /// it installs on first poll are in place while that cycle runs.
    pub async fn run<F>(&mut self, interval: Option<Duration>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if futures::poll!(shutdown.as_mut()).is_ready() {
            info!("Shutdown requested before the first cycle");
            return;
        }

        loop {
            if let Err(e) = self.run_cycle().await {
                error!(error = %format!("{e:#}"), "Reconciliation cycle failed");
            }

            let Some(interval) = interval else {
                debug!("Single-shot mode, not rescheduling");
                return;
            };

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping reconciliation loop");
                    return;
                }
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Run one full reconciliation cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only if ground truth could not be fetched; individual
    /// action failures are counted in the summary instead.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        let started = Instant::now();
        let result = self.reconcile().await;
        match &result {
            Ok(_) => metrics::record_cycle_success(started.elapsed()),
            Err(_) => metrics::record_cycle_error(started.elapsed()),
        }
        result
    }

    async fn reconcile(&mut self) -> Result<CycleSummary> {
        self.refresh_health().await;

        let record_name = self.client.record_name().to_string();
        let records = self
            .client
            .list(&record_name)
            .await
            .map(|listed| listed.value)
            .with_context(|| {
                format!("Failed to fetch ground truth for {record_name}, skipping reconciliation")
            })?;

        let assigned = resync_assignments(&mut self.store, &records);
        let healthy = self.store.healthy_count();
        if healthy == 0 {
            warn!(
                published = assigned,
                "All servers unhealthy, keeping existing records"
            );
        }

        let actions = plan_actions(&self.store, &records, self.clock.now(), self.grace_period);
        if actions.is_empty() {
            debug!("No changes required");
        } else {
            info!(
                actions = %actions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
                "Applying planned actions"
            );
        }

        let mut summary = CycleSummary {
            planned: actions.clone(),
            ..CycleSummary::default()
        };
        let mut live = assigned;

        for action in &actions {
            if action.kind == ActionKind::Unassign && live <= 1 {
                warn!(
                    server = %action.server.name,
                    "Skipping removal, it would leave no published records"
                );
                metrics::record_action(action.kind.as_str(), "skipped");
                summary.skipped += 1;
                continue;
            }

            match self.apply(action).await {
                Ok(()) => {
                    summary.applied += 1;
                    metrics::record_action(action.kind.as_str(), "success");
                    let assigned_now = action.kind == ActionKind::Assign;
                    if let Some(record) = self.store.get_mut(&action.server.name) {
                        record.is_assigned = assigned_now;
                    }
                    if assigned_now {
                        live += 1;
                    } else {
                        live -= 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::record_action(action.kind.as_str(), "error");
                    error!(
                        operation = action.kind.as_str(),
                        server = %action.server.name,
                        ip = %action.server.ip,
                        attempts = attempts_of(&e),
                        error = %e,
                        "Action failed, will re-evaluate next cycle"
                    );
                }
            }
        }

        for record in self.store.iter() {
            if record.is_healthy {
                summary.healthy.push(record.server.name.clone());
            }
            if record.is_primary {
                summary.primary.push(record.server.name.clone());
            }
            if record.is_assigned {
                summary.published.push(record.server.name.clone());
            }
        }
        metrics::set_state(summary.healthy.len(), summary.published.len());

        info!(
            healthy = ?summary.healthy,
            primary = ?summary.primary,
            published = ?summary.published,
            applied = summary.applied,
            failed = summary.failed,
            skipped = summary.skipped,
            "Reconciliation cycle complete"
        );

        Ok(summary)
    }

    /// Probe every server concurrently and apply the results in name order.
    async fn refresh_health(&mut self) {
        let servers: Vec<_> = self.store.servers().cloned().collect();
        let probe = Arc::clone(&self.probe);
        let results = join_all(servers.iter().map(|server| probe.probe(server))).await;

        let now = self.clock.now();
        for (server, result) in servers.iter().zip(results) {
            self.store.update_health(&server.name, result, now);
        }
    }

    async fn apply(&self, action: &Action) -> Result<(), ProviderError> {
        match action.kind {
            ActionKind::Assign => {
                let ip = action.server.ip.to_string();
                let created = self.client.create(&ip).await?;
                info!(
                    server = %action.server.name,
                    ip = %ip,
                    record_id = %created.value.id,
                    attempts = created.attempts,
                    reason = ?action.reason,
                    "Published server"
                );
            }
            ActionKind::Unassign => {
                let id = action.record_id.as_deref().unwrap_or_default();
                let deleted = self.client.delete(id).await?;
                info!(
                    server = %action.server.name,
                    ip = %action.server.ip,
                    record_id = %id,
                    attempts = deleted.attempts,
                    reason = ?action.reason,
                    "Withdrew server"
                );
            }
        }
        Ok(())
    }
}

/// Attempts made by a failed provider call, for logging.
fn attempts_of(err: &ProviderError) -> u32 {
    match err {
        ProviderError::Validation { .. } => 0,
        ProviderError::Exhausted { attempts, .. } => *attempts,
        _ => 1,
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
