// statsig-core/src/core/time.rs
// ============================================================================
// Module: Statsig Core Timestamps
// Description: Millisecond epoch timestamp wrapper.
// Purpose: Give spec/store timestamps a single, serializable representation.
// Dependencies: serde, std::time
// ============================================================================

//! ## Overview
//! The spec store and config-specs payload exchange timestamps as integer
//! milliseconds since the Unix epoch. This module centralizes that
//! representation so callers never pass around a bare `i64`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Millisecond-precision epoch timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps a raw millisecond epoch value.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the wall-clock time at the moment of the call.
    ///
    /// # Panics
    ///
    /// Never panics in practice: falls back to `0` if the system clock is
    /// set before the Unix epoch.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Returns the raw millisecond epoch value.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Zero timestamp, used as the "never updated" sentinel.
    pub const ZERO: Self = Self(0);
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
