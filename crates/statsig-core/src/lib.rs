// statsig-core/src/lib.rs
// ============================================================================
// Module: Statsig Core
// Description: Evaluation engine and spec store for server-side feature
//              gates, dynamic configs, and experiments.
// Purpose: Provide the backend-agnostic core a Statsig server SDK builds on.
// Dependencies: async-trait, serde, serde_json, sha2, thiserror, tokio
// ============================================================================

//! ## Overview
//! This crate holds the deterministic evaluation engine and the spec store
//! that a Statsig-style server SDK wraps: hashing and bucketing, the rule and
//! condition evaluators, the ID list differential sync, the error boundary,
//! and the dual-polling spec store that ties them together.
//!
//! It has no opinion about how specs or ID lists actually reach the process.
//! [`interfaces`] defines the collaborator traits (`Fetcher`, `DataAdapter`,
//! `ExceptionSink`, `Diagnostics`, `IpLocator`, `UserAgentParser`) a caller
//! implements against its own transport and storage; [`core`] and [`runtime`]
//! depend only on those traits.
//!
//! Invariants:
//! - [`runtime::SpecStore`] serves the most recent snapshot for which
//!   evaluation succeeded; a failed poll never clears an already-serving
//!   snapshot.
//! - Bucketing is integer-only SHA-256 math so two SDKs evaluating the same
//!   spec for the same user reach the same decision.
//! - An unrecognized condition type or operator evaluates to `false`, never
//!   to an error that would otherwise grant access.

/// Pure data model: identifiers, hashing, specs, users, ID lists, errors.
pub mod core;
/// Collaborator traits the runtime depends on: fetcher, adapter, sinks.
pub mod interfaces;
/// Evaluation engine, spec store orchestration, polling, and error capture.
pub mod runtime;

pub use core::AdapterKeyName;
pub use core::ConfigSpec;
pub use core::ConfigStore;
pub use core::SecondaryExposure;
pub use core::StatsigUser;
pub use core::Timestamp;
pub use interfaces::AdapterError;
pub use interfaces::DataAdapter;
pub use interfaces::Diagnostics;
pub use interfaces::ExceptionSink;
pub use interfaces::FetchError;
pub use interfaces::FetchResponse;
pub use interfaces::Fetcher;
pub use interfaces::IpLocator;
pub use interfaces::NoopDiagnostics;
pub use interfaces::PollingResource;
pub use interfaces::UserAgentParser;
pub use runtime::Decision;
pub use runtime::InitReason;
pub use runtime::SpecStore;
pub use runtime::SpecStoreConfig;
