// statsig-net/src/lib.rs
// ============================================================================
// Module: Statsig Net
// Description: Concrete network, adapter, and diagnostics collaborators.
// Purpose: Implement the collaborator traits statsig-core depends on.
// Dependencies: statsig-core, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! `statsig-core` defines its collaborators as traits (`Fetcher`,
//! `DataAdapter`, `ExceptionSink`, `IpLocator`, `UserAgentParser`) so its
//! evaluator and spec store never depend on a transport. This crate is one
//! set of concrete implementations of those traits: an HTTP fetcher and
//! exception sink backed by `reqwest`, an in-process `DataAdapter` for local
//! mode and tests, and best-effort IP/user-agent resolvers.

/// `reqwest`-backed `Fetcher` for config specs and ID lists.
pub mod http_fetcher;
/// `reqwest`-backed `ExceptionSink` posting to the `sdk_exception` endpoint.
pub mod http_exception_sink;
/// Best-effort `IpLocator`/`UserAgentParser` implementations.
pub mod local_resolvers;
/// In-process `DataAdapter` backed by a `HashMap`.
pub mod memory_adapter;

pub use http_exception_sink::HttpExceptionSink;
pub use http_fetcher::HttpFetcher;
pub use http_fetcher::HttpFetcherConfig;
pub use local_resolvers::NoopIpLocator;
pub use local_resolvers::NoopUserAgentParser;
pub use memory_adapter::InMemoryDataAdapter;
