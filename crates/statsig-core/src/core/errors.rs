// statsig-core/src/core/errors.rs
// ============================================================================
// Module: Statsig Core Error Taxonomy
// Description: Cross-cutting error kind used by the error boundary to decide
//              propagate vs. swallow vs. log-and-report.
// Purpose: Give every concern-specific error enum a shared classification.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Concern-specific errors (`SpecError`, `StoreError`, `FetchError`,
//! `AdapterError`, `EvalError`) each implement [`ClassifiedError`] so the
//! error boundary can decide how to handle them without knowing their
//! concrete type. The classification itself is three buckets:
//! propagate, swallow silently, or log-and-report with deduplication.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Classification used by the error boundary to decide how to handle a
/// failure surfaced from any collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsigErrorKind {
    /// The SDK was used before initialization completed; propagate to caller.
    Uninitialized,
    /// Caller supplied a malformed argument; propagate to caller.
    InvalidArgument,
    /// Network collaborator reported rate limiting; propagate to caller.
    TooManyRequests,
    /// Expected and harmless in local/offline mode; swallow without reporting.
    LocalModeNetwork,
    /// Anything else: log locally and report once per distinct error name.
    Unexpected,
}

impl StatsigErrorKind {
    /// Whether the error boundary should re-raise this error to the caller
    /// instead of capturing it.
    #[must_use]
    pub const fn should_propagate(self) -> bool {
        matches!(
            self,
            Self::Uninitialized | Self::InvalidArgument | Self::TooManyRequests
        )
    }

    /// Whether the error boundary should swallow this error without emitting
    /// a log line or exception report.
    #[must_use]
    pub const fn should_swallow_silently(self) -> bool {
        matches!(self, Self::LocalModeNetwork)
    }
}

/// Implemented by every concern-specific error enum so the error boundary can
/// classify a failure without downcasting.
pub trait ClassifiedError {
    /// Returns this error's classification.
    fn kind(&self) -> StatsigErrorKind;
}

// ============================================================================
// SECTION: Evaluation Errors
// ============================================================================

/// Errors raised while evaluating a rule or condition.
#[derive(Debug, Error)]
pub enum EvalError {
    /// No spec exists with the requested name.
    #[error("no spec named {0}")]
    UnknownSpec(String),
    /// A `pass_gate`/`fail_gate`/`multi_pass_gate`/`multi_fail_gate` chain
    /// exceeded the recursion depth guard.
    #[error("gate recursion depth exceeded evaluating {0}")]
    RecursionDepthExceeded(String),
}

impl ClassifiedError for EvalError {
    fn kind(&self) -> StatsigErrorKind {
        StatsigErrorKind::Unexpected
    }
}

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors raised by the spec store's init or polling paths.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Called an API before `initialize` completed.
    #[error("spec store used before initialization")]
    Uninitialized,
    /// No collaborator (network, adapter, or bootstrap value) produced a
    /// usable snapshot during initialization.
    #[error("no source produced a valid config specs snapshot")]
    NoSourceAvailable,
    /// The fetcher reported the SDK is operating in local/offline mode.
    #[error("network unavailable in local mode")]
    LocalModeNetwork,
    /// Underlying spec validation failed; the snapshot is rejected wholesale.
    #[error("spec validation failed: {0}")]
    Spec(#[from] super::spec::SpecError),
}

impl ClassifiedError for StoreError {
    fn kind(&self) -> StatsigErrorKind {
        match self {
            Self::Uninitialized => StatsigErrorKind::Uninitialized,
            Self::LocalModeNetwork => StatsigErrorKind::LocalModeNetwork,
            Self::NoSourceAvailable | Self::Spec(_) => StatsigErrorKind::Unexpected,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagated_kinds_are_exactly_the_three_named() {
        assert!(StatsigErrorKind::Uninitialized.should_propagate());
        assert!(StatsigErrorKind::InvalidArgument.should_propagate());
        assert!(StatsigErrorKind::TooManyRequests.should_propagate());
        assert!(!StatsigErrorKind::LocalModeNetwork.should_propagate());
        assert!(!StatsigErrorKind::Unexpected.should_propagate());
    }

    #[test]
    fn only_local_mode_network_is_silently_swallowed() {
        assert!(StatsigErrorKind::LocalModeNetwork.should_swallow_silently());
        assert!(!StatsigErrorKind::Unexpected.should_swallow_silently());
    }

    #[test]
    fn store_error_classification_matches_taxonomy() {
        assert_eq!(StoreError::Uninitialized.kind(), StatsigErrorKind::Uninitialized);
        assert_eq!(StoreError::LocalModeNetwork.kind(), StatsigErrorKind::LocalModeNetwork);
        assert_eq!(StoreError::NoSourceAvailable.kind(), StatsigErrorKind::Unexpected);
    }
}
