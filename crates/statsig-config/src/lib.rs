// statsig-config/src/lib.rs
// ============================================================================
// Module: Statsig Config
// Description: Ambient SDK configuration and logging bootstrap.
// Purpose: Give an embedder a validated StatsigOptions and an opt-in
//          tracing subscriber bootstrap.
// Dependencies: statsig-core, serde, thiserror, toml, tracing-subscriber
// ============================================================================

//! ## Overview
//! This crate is the configuration and bootstrap layer around
//! `statsig-core`: [`StatsigOptions`] carries the SDK-wide knobs
//! (`statsig-core`'s `SpecStore` takes a bare [`statsig_core::SpecStoreConfig`]
//! so it does not need to know this crate exists), and [`init_tracing`]
//! is an opt-in structured-logging bootstrap for standalone embedders.

/// Logging bootstrap.
pub mod logging;
/// `StatsigOptions` and its builder/validation.
pub mod options;

pub use logging::init_tracing;
pub use options::ConfigError;
pub use options::IdListHydration;
pub use options::StatsigOptions;
pub use options::StatsigOptionsBuilder;
