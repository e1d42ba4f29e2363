// statsig-core/src/runtime/error_boundary.rs
// ============================================================================
// Module: Statsig Runtime Error Boundary
// Description: Captures unexpected failures, deduplicates, and reports them.
// Purpose: Give every collaborator call a single place to decide propagate
//          vs. swallow vs. log-and-report.
// Dependencies: crate::core::errors, crate::interfaces::ExceptionSink, serde_json
// ============================================================================

//! ## Overview
//! [`ErrorBoundary::capture`] wraps a fallible async task. Its outcome
//! depends entirely on the task's error [`StatsigErrorKind`] classification:
//! `Uninitialized`/`InvalidArgument`/`TooManyRequests` propagate to the
//! caller unchanged; `LocalModeNetwork` is recovered silently; everything
//! else is logged and reported once per distinct error name or explicit key,
//! then recovered. Recovery always happens except for the three propagated
//! kinds — the boundary exists so evaluator callers never see an unexpected
//! panic-shaped failure, only a best-effort default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::ClassifiedError;
use crate::interfaces::ExceptionSink;

// ============================================================================
// SECTION: SDK Metadata
// ============================================================================

/// Static SDK identity attached to every exception report.
#[derive(Debug, Clone)]
pub struct SdkMetadata {
    /// SDK type string, e.g. `"rust-server"`.
    pub sdk_type: String,
    /// SDK semantic version.
    pub sdk_version: String,
}

// ============================================================================
// SECTION: Error Boundary
// ============================================================================

/// Wraps collaborator calls with the propagate/swallow/report policy of
/// spec.md §4.7.
pub struct ErrorBoundary {
    sink: Arc<dyn ExceptionSink>,
    metadata: SdkMetadata,
    reported: Mutex<HashSet<String>>,
}

#[derive(Serialize)]
struct ExceptionPayload<'a> {
    exception: String,
    info: String,
    #[serde(rename = "statsigMetadata")]
    statsig_metadata: StatsigMetadataPayload<'a>,
}

#[derive(Serialize)]
struct StatsigMetadataPayload<'a> {
    #[serde(rename = "sdkType")]
    sdk_type: &'a str,
    #[serde(rename = "sdkVersion")]
    sdk_version: &'a str,
}

impl ErrorBoundary {
    /// Creates a new error boundary reporting through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ExceptionSink>, metadata: SdkMetadata) -> Self {
        Self {
            sink,
            metadata,
            reported: Mutex::new(HashSet::new()),
        }
    }

    /// Runs `task`; on success returns its value. On failure, classifies the
    /// error: propagated kinds return `Err` unchanged; all others are
    /// recovered via `recover` after an appropriate report (silent for
    /// `LocalModeNetwork`, deduplicated-and-reported for everything else).
    ///
    /// `key` overrides the deduplication key; when absent the error's
    /// `Display` string is used, matching "deduplicated via
    /// an in-memory set, keyed by error name or explicit key".
    pub async fn capture<T, E, Fut>(
        &self,
        key: Option<&str>,
        task: impl FnOnce() -> Fut,
        recover: impl FnOnce(&E) -> T,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiedError + std::fmt::Display,
    {
        match task().await {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = err.kind();
                if kind.should_propagate() {
                    return Err(err);
                }
                if !kind.should_swallow_silently() {
                    let dedup_key = key.map_or_else(|| err.to_string(), str::to_string);
                    self.report_once(&dedup_key, &err).await;
                }
                Ok(recover(&err))
            }
        }
    }

    /// Reports `err` under `dedup_key` at most once per boundary lifetime.
    async fn report_once(&self, dedup_key: &str, err: &impl std::fmt::Display) {
        let is_new = {
            let mut reported = match self.reported.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            reported.insert(dedup_key.to_string())
        };
        if !is_new {
            return;
        }
        tracing::error!(error = %err, key = dedup_key, "statsig: unexpected error captured by error boundary");
        let payload = ExceptionPayload {
            exception: err.to_string(),
            info: dedup_key.to_string(),
            statsig_metadata: StatsigMetadataPayload {
                sdk_type: &self.metadata.sdk_type,
                sdk_version: &self.metadata.sdk_version,
            },
        };
        match serde_json::to_vec(&payload) {
            Ok(bytes) => self.sink.report_exception(&bytes).await,
            Err(err) => tracing::debug!(error = %err, "statsig: failed to serialize exception payload"),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StatsigErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum FakeError {
        #[error("uninitialized")]
        Uninitialized,
        #[error("boom")]
        Unexpected,
        #[error("local mode")]
        LocalMode,
    }

    impl ClassifiedError for FakeError {
        fn kind(&self) -> StatsigErrorKind {
            match self {
                Self::Uninitialized => StatsigErrorKind::Uninitialized,
                Self::Unexpected => StatsigErrorKind::Unexpected,
                Self::LocalMode => StatsigErrorKind::LocalModeNetwork,
            }
        }
    }

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExceptionSink for CountingSink {
        async fn report_exception(&self, _payload: &[u8]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn boundary(sink: Arc<CountingSink>) -> ErrorBoundary {
        ErrorBoundary::new(
            sink,
            SdkMetadata {
                sdk_type: "rust-server".to_string(),
                sdk_version: "0.1.0".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn propagated_kind_returns_err_without_reporting() {
        let sink = Arc::new(CountingSink::default());
        let eb = boundary(sink.clone());
        let result: Result<i32, FakeError> =
            eb.capture(None, || async { Err(FakeError::Uninitialized) }, |_| -1).await;
        assert!(result.is_err());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_mode_network_is_recovered_without_reporting() {
        let sink = Arc::new(CountingSink::default());
        let eb = boundary(sink.clone());
        let result = eb.capture(None, || async { Err(FakeError::LocalMode) }, |_| -1).await;
        assert_eq!(result, Ok(-1));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unexpected_error_is_reported_once_per_key() {
        let sink = Arc::new(CountingSink::default());
        let eb = boundary(sink.clone());
        let _ = eb.capture(Some("k"), || async { Err(FakeError::Unexpected) }, |_| -1).await;
        let _ = eb.capture(Some("k"), || async { Err(FakeError::Unexpected) }, |_| -1).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_path_never_reports() {
        let sink = Arc::new(CountingSink::default());
        let eb = boundary(sink.clone());
        let result: Result<i32, FakeError> = eb.capture(None, || async { Ok(5) }, |_| -1).await;
        assert_eq!(result, Ok(5));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
