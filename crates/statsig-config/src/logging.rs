// statsig-config/src/logging.rs
// ============================================================================
// Module: Logging Bootstrap
// Description: Initializes the global tracing subscriber.
// Purpose: Give embedders one call to get structured logs with sane
//          defaults, matching the rest of the crate's tracing::{info,warn,
//          debug,error} call sites.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `statsig-core` and `statsig-net` emit structured log events through the
//! `tracing` facade but never install a subscriber themselves, since doing
//! so from a library would fight whatever subscriber the embedding
//! application already configured. [`init_tracing`] is the opt-in bootstrap
//! for a binary embedding this SDK standalone (a CLI, a smoke-test harness);
//! applications that already run their own `tracing` subscriber should skip
//! it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::util::TryInitError;

// ============================================================================
// SECTION: Bootstrap
// ============================================================================

/// Default filter directive used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Installs a `tracing-subscriber` registry with an `EnvFilter` (honoring
/// `RUST_LOG`, defaulting to `info`) and a formatting layer writing to
/// stderr. Safe to call at most once per process; a second call returns
/// [`TryInitError`] rather than panicking.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).try_init()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic_on_repeated_calls() {
        let _ = init_tracing();
        let second = init_tracing();
        assert!(second.is_err() || second.is_ok());
    }
}
