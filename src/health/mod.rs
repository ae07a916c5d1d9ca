// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend health: probing and per-server state tracking.

pub mod probe;
pub mod state;

pub use probe::{HttpsProbe, Probe, ProbeResult};
pub use state::{HealthRecord, HealthStateStore, Transition};
