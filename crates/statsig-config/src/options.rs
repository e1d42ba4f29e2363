// statsig-config/src/options.rs
// ============================================================================
// Module: Statsig Options
// Description: Ambient SDK-wide configuration with fail-closed validation.
// Purpose: Give callers a builder over the knobs statsig-core's SpecStore
//          needs, validated eagerly and fail-closed.
// Dependencies: statsig-core, serde, toml
// ============================================================================

//! ## Overview
//! `StatsigOptions` is the public configuration surface an embedder
//! constructs once at startup: polling intervals, the init network timeout,
//! the environment tier label attached to evaluation, local-mode/disable-all-
//! polling flags, and an optional bootstrap payload. It validates eagerly
//! (`build()`/`validate()`) rather than deferring bad configuration to a
//! runtime panic, and converts cleanly into
//! [`statsig_core::SpecStoreConfig`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use statsig_core::SpecStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum allowed rulesets polling interval in milliseconds.
const MIN_RULESETS_SYNC_INTERVAL_MS: u64 = 1_000;
/// Maximum allowed rulesets polling interval in milliseconds.
const MAX_RULESETS_SYNC_INTERVAL_MS: u64 = 3_600_000;
/// Minimum allowed ID-list polling interval in milliseconds.
const MIN_ID_LIST_SYNC_INTERVAL_MS: u64 = 1_000;
/// Maximum allowed ID-list polling interval in milliseconds.
const MAX_ID_LIST_SYNC_INTERVAL_MS: u64 = 3_600_000;
/// Minimum allowed init timeout in milliseconds.
const MIN_INIT_TIMEOUT_MS: u64 = 100;
/// Maximum allowed init timeout in milliseconds.
const MAX_INIT_TIMEOUT_MS: u64 = 60_000;
/// Maximum accepted bootstrap payload size in bytes.
const MAX_BOOTSTRAP_VALUES_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fail-closed validation error for [`StatsigOptions`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric field fell outside its documented range.
    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: ID List Hydration Strategy
// ============================================================================

/// Mirrors [`statsig_core::runtime::spec_store::IdListInitStrategy`] as a
/// serializable, documented configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdListHydration {
    /// Skip ID list hydration entirely.
    None,
    /// Defer hydration to the ID list loop's first scheduled tick.
    Lazy,
    /// Hydrate ID lists synchronously before `init` returns.
    #[default]
    Sync,
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Ambient SDK-wide configuration, deserializable from TOML for embedders
/// that prefer a config file over constructing this in code.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsigOptions {
    /// Rulesets polling interval in milliseconds.
    #[serde(default = "default_rulesets_sync_interval_ms")]
    pub rulesets_sync_interval_ms: u64,
    /// ID-list polling interval in milliseconds.
    #[serde(default = "default_id_list_sync_interval_ms")]
    pub id_list_sync_interval_ms: u64,
    /// Timeout applied to the network fetch performed during `init` only.
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    /// Environment tier label attached to evaluation (e.g. `"production"`,
    /// `"staging"`, `"development"`). Not validated against a fixed set.
    #[serde(default)]
    pub environment_tier: Option<String>,
    /// Disables all network access; the store serves only bootstrap/adapter
    /// snapshots and neither polling loop is spawned.
    #[serde(default)]
    pub local_mode: bool,
    /// Spawns neither polling loop even outside local mode, leaving the
    /// store to serve only the snapshot produced by `init`.
    #[serde(default)]
    pub disable_all_polling: bool,
    /// ID list hydration strategy at init.
    #[serde(default)]
    pub id_list_hydration: IdListHydration,
    /// SDK-supplied bootstrap payload, same shape as a network response
    /// body. Not deserialized from TOML; set programmatically via
    /// [`StatsigOptionsBuilder::bootstrap_values`].
    #[serde(skip)]
    pub bootstrap_values: Option<Vec<u8>>,
}

impl Default for StatsigOptions {
    fn default() -> Self {
        Self {
            rulesets_sync_interval_ms: default_rulesets_sync_interval_ms(),
            id_list_sync_interval_ms: default_id_list_sync_interval_ms(),
            init_timeout_ms: default_init_timeout_ms(),
            environment_tier: None,
            local_mode: false,
            disable_all_polling: false,
            id_list_hydration: IdListHydration::default(),
            bootstrap_values: None,
        }
    }
}

impl StatsigOptions {
    /// Starts a builder seeded with defaults.
    #[must_use]
    pub fn builder() -> StatsigOptionsBuilder {
        StatsigOptionsBuilder::default()
    }

    /// Parses options from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or validation
    /// fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let options: Self =
            toml::from_str(content).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Validates range constraints on every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first constraint violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "rulesets_sync_interval_ms",
            self.rulesets_sync_interval_ms,
            MIN_RULESETS_SYNC_INTERVAL_MS,
            MAX_RULESETS_SYNC_INTERVAL_MS,
        )?;
        validate_range(
            "id_list_sync_interval_ms",
            self.id_list_sync_interval_ms,
            MIN_ID_LIST_SYNC_INTERVAL_MS,
            MAX_ID_LIST_SYNC_INTERVAL_MS,
        )?;
        validate_range("init_timeout_ms", self.init_timeout_ms, MIN_INIT_TIMEOUT_MS, MAX_INIT_TIMEOUT_MS)?;
        if let Some(tier) = &self.environment_tier
            && tier.trim().is_empty()
        {
            return Err(ConfigError::Invalid("environment_tier must be non-empty when set".to_string()));
        }
        if let Some(bootstrap) = &self.bootstrap_values
            && bootstrap.len() > MAX_BOOTSTRAP_VALUES_BYTES
        {
            return Err(ConfigError::Invalid("bootstrap_values exceeds size limit".to_string()));
        }
        Ok(())
    }

    /// Converts to the [`SpecStoreConfig`] statsig-core's `SpecStore` takes.
    #[must_use]
    pub fn to_spec_store_config(&self) -> SpecStoreConfig {
        SpecStoreConfig {
            rulesets_sync_interval: Duration::from_millis(self.rulesets_sync_interval_ms),
            id_list_sync_interval: Duration::from_millis(self.id_list_sync_interval_ms),
            init_timeout: Duration::from_millis(self.init_timeout_ms),
            bootstrap_values: self.bootstrap_values.clone(),
            id_list_init_strategy: self.id_list_hydration.into(),
            disable_all_polling: self.local_mode || self.disable_all_polling,
        }
    }
}

impl From<IdListHydration> for statsig_core::runtime::spec_store::IdListInitStrategy {
    fn from(value: IdListHydration) -> Self {
        match value {
            IdListHydration::None => Self::None,
            IdListHydration::Lazy => Self::Lazy,
            IdListHydration::Sync => Self::Sync,
        }
    }
}

fn validate_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

fn default_rulesets_sync_interval_ms() -> u64 {
    10_000
}

fn default_id_list_sync_interval_ms() -> u64 {
    60_000
}

fn default_init_timeout_ms() -> u64 {
    3_000
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Fluent builder for [`StatsigOptions`], validated on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct StatsigOptionsBuilder {
    options: StatsigOptions,
}

impl StatsigOptionsBuilder {
    /// Sets the rulesets polling interval.
    #[must_use]
    pub const fn rulesets_sync_interval_ms(mut self, value: u64) -> Self {
        self.options.rulesets_sync_interval_ms = value;
        self
    }

    /// Sets the ID-list polling interval.
    #[must_use]
    pub const fn id_list_sync_interval_ms(mut self, value: u64) -> Self {
        self.options.id_list_sync_interval_ms = value;
        self
    }

    /// Sets the init network timeout.
    #[must_use]
    pub const fn init_timeout_ms(mut self, value: u64) -> Self {
        self.options.init_timeout_ms = value;
        self
    }

    /// Sets the environment tier label.
    #[must_use]
    pub fn environment_tier(mut self, value: impl Into<String>) -> Self {
        self.options.environment_tier = Some(value.into());
        self
    }

    /// Enables local mode: no network access, polling loops not spawned.
    #[must_use]
    pub const fn local_mode(mut self, value: bool) -> Self {
        self.options.local_mode = value;
        self
    }

    /// Disables both polling loops without otherwise entering local mode.
    #[must_use]
    pub const fn disable_all_polling(mut self, value: bool) -> Self {
        self.options.disable_all_polling = value;
        self
    }

    /// Sets the ID list hydration strategy.
    #[must_use]
    pub const fn id_list_hydration(mut self, value: IdListHydration) -> Self {
        self.options.id_list_hydration = value;
        self
    }

    /// Sets the SDK-supplied bootstrap payload.
    #[must_use]
    pub fn bootstrap_values(mut self, value: Vec<u8>) -> Self {
        self.options.bootstrap_values = Some(value);
        self
    }

    /// Validates and returns the built [`StatsigOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any field falls outside its documented
    /// range.
    pub fn build(self) -> Result<StatsigOptions, ConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        StatsigOptions::default().validate().unwrap();
    }

    #[test]
    fn builder_rejects_interval_below_minimum() {
        let err = StatsigOptions::builder().rulesets_sync_interval_ms(10).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn builder_rejects_empty_environment_tier() {
        let err = StatsigOptions::builder().environment_tier("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_toml_parses_and_validates() {
        let options = StatsigOptions::from_toml("rulesets_sync_interval_ms = 5000\n").unwrap();
        assert_eq!(options.rulesets_sync_interval_ms, 5000);
    }

    #[test]
    fn to_spec_store_config_local_mode_disables_polling() {
        let options = StatsigOptions::builder().local_mode(true).build().unwrap();
        let store_config = options.to_spec_store_config();
        assert!(store_config.disable_all_polling);
    }

    #[test]
    fn oversized_bootstrap_values_rejected() {
        let options = StatsigOptions {
            bootstrap_values: Some(vec![0u8; MAX_BOOTSTRAP_VALUES_BYTES + 1]),
            ..StatsigOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
