// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for dnssteer.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

use std::time::Duration;

// ============================================================================
// Health Checking
// ============================================================================

/// Per-probe request timeout (3 seconds)
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Minimum time a server must stay unhealthy before its record may be removed
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 30;

/// JSON keys checked (in order) for the primary role indicator in a health payload
pub const PRIMARY_FLAG_KEYS: [&str; 3] = ["primary", "isPrimary", "is_primary"];

// ============================================================================
// DNS Provider
// ============================================================================

/// Default Cloudflare v4 API base URL
pub const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Timeout for a single provider request (10 seconds)
pub const PROVIDER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between any two outbound provider calls
pub const PROVIDER_MIN_CALL_SPACING: Duration = Duration::from_millis(1000);

/// Delays between provider retry attempts (4 retries, 5 attempts total)
pub const PROVIDER_RETRY_DELAYS: [Duration; 4] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// DNS record type managed by dnssteer
pub const RECORD_TYPE_A: &str = "A";

/// Default TTL for published A records (seconds)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 60;

/// Cloudflare's "automatic" TTL marker
pub const CLOUDFLARE_AUTO_TTL: u32 = 1;

/// Smallest explicit TTL Cloudflare accepts (seconds)
pub const MIN_RECORD_TTL_SECS: u32 = 30;

/// Largest explicit TTL Cloudflare accepts (seconds)
pub const MAX_RECORD_TTL_SECS: u32 = 86_400;

/// Page size requested when listing records
pub const LIST_PAGE_SIZE: u32 = 100;

/// Cloudflare error codes that signal throttling on an otherwise non-429 response
pub const CLOUDFLARE_RATE_LIMIT_CODES: [u32; 2] = [971, 10100];

/// Length of a Cloudflare object identifier (lowercase hex)
pub const CLOUDFLARE_ID_LEN: usize = 32;

// ============================================================================
// Process
// ============================================================================

/// Exit status for configuration or credential validation failures
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Exit status for any other fatal startup failure
pub const EXIT_STARTUP_ERROR: i32 = 1;
