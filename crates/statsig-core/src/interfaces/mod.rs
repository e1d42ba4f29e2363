// statsig-core/src/interfaces/mod.rs
// ============================================================================
// Module: Statsig Core Interfaces
// Description: Backend-agnostic collaborator interfaces for network, cache,
//              and diagnostics integration.
// Purpose: Define the contract surfaces the runtime depends on without
//          embedding backend-specific details.
// Dependencies: crate::core, async-trait
// ============================================================================

//! ## Overview
//! Interfaces define how the spec store integrates with external systems
//! without embedding backend-specific details. Implementations must fail
//! closed on missing or invalid data and must never block the polling loops
//! longer than their own timeout budget.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AdapterKeyName;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// A network response body plus the timestamp the spec store should record
/// as the snapshot's update time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// `Content-Length` reported by the server, if present.
    pub content_length: Option<u64>,
    /// Whether the server reported `304 Not Modified` / an empty delta.
    pub not_modified: bool,
}

/// Fetcher errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The SDK is configured for local/offline mode; no network call was made.
    #[error("network unavailable in local mode")]
    LocalMode,
    /// The server reported a rate limit.
    #[error("rate limited by server")]
    TooManyRequests,
    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// Server responded with a non-success status code.
    #[error("server returned status {0}")]
    Status(u16),
}

/// Backend-agnostic network collaborator.
///
/// Implementations perform the actual HTTP calls; the spec store and ID list
/// poller depend only on this trait so they can be tested against an
/// in-memory fake.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the full config specs payload, optionally since a prior sync
    /// time (used to let the server short-circuit with an empty delta).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, rate limiting, or local
    /// mode.
    async fn fetch_config_specs(&self, since: Option<Timestamp>) -> Result<FetchResponse, FetchError>;

    /// Fetches the list of available ID lists and their current metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, rate limiting, or local
    /// mode.
    async fn fetch_id_list_index(&self) -> Result<FetchResponse, FetchError>;

    /// Fetches a ranged slice of a single ID list's file, starting at
    /// `range_start` bytes's differential fetch.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, rate limiting, or local
    /// mode.
    async fn fetch_id_list_range(&self, url: &str, range_start: u64) -> Result<FetchResponse, FetchError>;

    /// Posts a deduplicated exception report to the diagnostics endpoint.
    /// Failures here are logged, never propagated.
    async fn post_exception(&self, payload: &[u8]);
}

// ============================================================================
// SECTION: Data Adapter
// ============================================================================

/// Adapter errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter's backing store is unavailable.
    #[error("data adapter unavailable: {0}")]
    Unavailable(String),
}

/// The two independently-polled resources an adapter may advertise steady-
/// state polling support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingResource {
    /// Config specs (gates/configs/layers).
    Rulesets,
    /// ID list membership.
    IdLists,
}

/// Pluggable cache/source for config specs and ID list snapshots, used for
/// bootstrap, steady-state polling, and save-through persistence.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Prepares the adapter for use. Called at most once, before any `get`/
    /// `set` call, during spec store initialization.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backing store cannot be reached.
    async fn initialize(&self) -> Result<(), AdapterError>;

    /// Releases adapter resources. Called at most once, during spec store
    /// shutdown.
    async fn shutdown(&self);

    /// Reads the raw bytes previously stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backing store cannot be reached.
    async fn get(&self, key: &AdapterKeyName) -> Result<Option<Vec<u8>>, AdapterError>;

    /// Writes raw bytes under `key`, overwriting any prior value. `time` is
    /// the `lastUpdateTime` of the data being written and is persisted
    /// alongside it as the adapter's version of that key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backing store cannot be reached.
    async fn set(&self, key: &AdapterKeyName, value: Vec<u8>, time: Timestamp) -> Result<(), AdapterError>;

    /// Whether this adapter should be consulted first on each steady-state
    /// poll of `resource`, instead of the network. Defaults to `false`: an
    /// adapter that exists only for bootstrap/save-through does not
    /// participate in steady-state sync source selection.
    fn supports_polling_updates_for(&self, resource: PollingResource) -> bool {
        let _ = resource;
        false
    }
}

// ============================================================================
// SECTION: Exception Sink
// ============================================================================

/// Narrow collaborator the error boundary posts deduplicated exception
/// reports through (`sdk_exception` endpoint). Kept separate
/// from [`Fetcher`] so the error boundary can be exercised in tests without a
/// full fetcher fake.
#[async_trait]
pub trait ExceptionSink: Send + Sync {
    /// Reports one already-serialized exception payload. Implementations
    /// must swallow their own transport failures; the error boundary has no
    /// fallback path for a failed report.
    async fn report_exception(&self, payload: &[u8]);
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Marker emitted by the runtime for latency/outcome instrumentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsMarker {
    /// Marker key, e.g. `config_sync`, `id_list_sync`, `initialize`.
    pub key: &'static str,
    /// Marker step, e.g. `start`, `end`.
    pub step: &'static str,
    /// Whether the operation this marker describes succeeded.
    pub success: Option<bool>,
}

/// Sink for diagnostics markers. Implementations must not block or panic;
/// diagnostics are best-effort observability, never load-bearing.
pub trait Diagnostics: Send + Sync {
    /// Records a marker.
    fn mark(&self, marker: DiagnosticsMarker);
}

/// A [`Diagnostics`] sink that discards every marker, used when diagnostics
/// are not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn mark(&self, _marker: DiagnosticsMarker) {}
}

// ============================================================================
// SECTION: IP / User-Agent Resolution
// ============================================================================

/// Resolves an IP address to a coarse location, used by `ip_based` conditions
/// when the user object does not already carry a `country` field.
pub trait IpLocator: Send + Sync {
    /// Returns the ISO country code for `ip`, if resolvable.
    fn country_for_ip(&self, ip: &str) -> Option<String>;
}

/// Parses a user agent string into the fields `ua_based` conditions read.
pub trait UserAgentParser: Send + Sync {
    /// Returns the parsed OS name, if recognized.
    fn os_name(&self, user_agent: &str) -> Option<String>;
    /// Returns the parsed browser name, if recognized.
    fn browser_name(&self, user_agent: &str) -> Option<String>;
}
