// statsig-core/src/runtime/spec_store.rs
// ============================================================================
// Module: Statsig Runtime Spec Store
// Description: Owns the live snapshot and the two steady-state polling loops.
// Purpose: Bootstrap, adapter, and network fan-in at init; bounded-failure
//          polling thereafter; atomic snapshot publication for evaluators.
// Dependencies: crate::core, crate::interfaces, crate::runtime::{polling,
//               id_list_sync, condition_evaluator, rule_evaluator}, tokio
// ============================================================================

//! ## Overview
//! The spec store is the one stateful component in this crate. On
//! [`SpecStore::init`] it fan-in bootstraps from adapter, bootstrap values,
//! and network, first successful source wins.
//! Afterward two independent, non-reentrant [`PollingLoop`]s keep the
//! ruleset snapshot and ID list membership fresh. Every successful sync
//! replaces the whole snapshot atomically behind a single `RwLock<Arc<_>>`,
//! so evaluators reading through [`SpecStore::get_gate`] and friends never
//! observe a partially-applied update.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::core::ConfigSpec;
use crate::core::ConfigStore;
use crate::core::ConfigStoreBuildError;
use crate::core::IdList;
use crate::core::IdListIndex;
use crate::core::IdListName;
use crate::core::SecondaryExposure;
use crate::core::StatsigUser;
use crate::core::Timestamp;
use crate::interfaces::AdapterError;
use crate::interfaces::DataAdapter;
use crate::interfaces::Diagnostics;
use crate::interfaces::DiagnosticsMarker;
use crate::interfaces::FetchError;
use crate::interfaces::Fetcher;
use crate::interfaces::IpLocator;
use crate::interfaces::NoopDiagnostics;
use crate::interfaces::PollingResource;
use crate::interfaces::UserAgentParser;
use crate::core::AdapterKeyName;
use crate::core::EvalError;
use crate::runtime::condition_evaluator::ConditionContext;
use crate::runtime::condition_evaluator::GateResolver;
use crate::runtime::id_list_sync::ListLookupEntry;
use crate::runtime::id_list_sync::apply_fetch_result;
use crate::runtime::id_list_sync::apply_lookup;
use crate::runtime::polling::PollingLoop;
use crate::runtime::polling::TickFn;
use crate::runtime::rule_evaluator::Decision;
use crate::runtime::rule_evaluator::DelegateResolver;
use crate::runtime::rule_evaluator::evaluate_spec;

// ============================================================================
// SECTION: Init Reason
// ============================================================================

/// Which source produced the store's current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitReason {
    /// No snapshot has been successfully applied yet.
    Uninitialized,
    /// The most recent applying source was a network fetch.
    Network,
    /// The store was initialized from SDK-supplied bootstrap values.
    Bootstrap,
    /// The store was initialized from a [`DataAdapter`].
    DataAdapter,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// How the store handles ID list hydration during [`SpecStore::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdListInitStrategy {
    /// Skip ID list hydration entirely.
    None,
    /// Defer hydration to the ID list loop's first scheduled tick.
    Lazy,
    /// Hydrate ID lists synchronously before `init` returns.
    Sync,
}

impl Default for IdListInitStrategy {
    fn default() -> Self {
        Self::Sync
    }
}

/// Tunables for a [`SpecStore`] instance. Ambient SDK-wide knobs (polling
/// intervals, init timeout, bootstrap payload) live here rather than as bare
/// constructor arguments so a caller can construct one from
/// `statsig-config`'s `StatsigOptions` and pass it through untouched.
#[derive(Debug, Clone)]
pub struct SpecStoreConfig {
    /// Period of the ruleset polling loop.
    pub rulesets_sync_interval: Duration,
    /// Period of the ID list polling loop.
    pub id_list_sync_interval: Duration,
    /// Timeout applied to the network fetch performed during `init` only.
    pub init_timeout: Duration,
    /// SDK-supplied bootstrap payload, same shape as a network response body.
    pub bootstrap_values: Option<Vec<u8>>,
    /// ID list hydration strategy at init.
    pub id_list_init_strategy: IdListInitStrategy,
    /// When set, neither polling loop is spawned; the store only ever serves
    /// the snapshot produced by `init`. Used for local/offline mode and tests.
    pub disable_all_polling: bool,
}

impl Default for SpecStoreConfig {
    fn default() -> Self {
        Self {
            rulesets_sync_interval: Duration::from_secs(10),
            id_list_sync_interval: Duration::from_secs(60),
            init_timeout: Duration::from_secs(3),
            bootstrap_values: None,
            id_list_init_strategy: IdListInitStrategy::default(),
            disable_all_polling: false,
        }
    }
}

// ============================================================================
// SECTION: Watchdog Report
// ============================================================================

/// Returned by [`SpecStore::reset_sync_timer_if_exited`] describing which
/// timers were found dead, cleared, and rescheduled. `None` means both
/// timers were alive and nothing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogResetReport {
    /// Whether the ruleset loop was found dead and rescheduled.
    pub rulesets_reset: bool,
    /// Whether the ID list loop was found dead and rescheduled.
    pub id_lists_reset: bool,
}

// ============================================================================
// SECTION: Spec Store
// ============================================================================

/// Owns the live snapshot and the two steady-state polling loops.
pub struct SpecStore {
    snapshot: RwLock<Arc<ConfigStore>>,
    id_lists: RwLock<HashMap<IdListName, IdList>>,
    init_reason: Mutex<InitReason>,
    serving: AtomicBool,
    started_at: Instant,

    fetcher: Arc<dyn Fetcher>,
    adapter: Option<Arc<dyn DataAdapter>>,
    diagnostics: Arc<dyn Diagnostics>,
    ip_locator: Option<Arc<dyn IpLocator>>,
    ua_parser: Option<Arc<dyn UserAgentParser>>,
    config: SpecStoreConfig,

    rulesets_loop: PollingLoop,
    id_list_loop: PollingLoop,
}

impl SpecStore {
    /// Creates a store with an empty snapshot. No I/O happens until
    /// [`SpecStore::init`] is called.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, adapter: Option<Arc<dyn DataAdapter>>, config: SpecStoreConfig) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ConfigStore::default())),
            id_lists: RwLock::new(HashMap::new()),
            init_reason: Mutex::new(InitReason::Uninitialized),
            serving: AtomicBool::new(false),
            started_at: Instant::now(),
            fetcher,
            adapter,
            diagnostics: Arc::new(NoopDiagnostics),
            ip_locator: None,
            ua_parser: None,
            config: SpecStoreConfig { rulesets_sync_interval: config.rulesets_sync_interval, ..config },
            rulesets_loop: PollingLoop::new("rulesets", config_or_default_period(&config.rulesets_sync_interval)),
            id_list_loop: PollingLoop::new("id_lists", config_or_default_period(&config.id_list_sync_interval)),
        }
    }

    /// Attaches a diagnostics sink, replacing the no-op default.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Attaches an IP locator used by `ip_based` condition fallback.
    #[must_use]
    pub fn with_ip_locator(mut self, locator: Arc<dyn IpLocator>) -> Self {
        self.ip_locator = Some(locator);
        self
    }

    /// Attaches a user-agent parser used by `ua_based` condition fallback.
    #[must_use]
    pub fn with_ua_parser(mut self, parser: Arc<dyn UserAgentParser>) -> Self {
        self.ua_parser = Some(parser);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the named feature gate spec from the current snapshot, if any.
    #[must_use]
    pub fn get_gate(&self, name: &str) -> Option<ConfigSpec> {
        self.read_snapshot().gates.get(name).cloned()
    }

    /// Returns the named dynamic config spec from the current snapshot, if any.
    #[must_use]
    pub fn get_config(&self, name: &str) -> Option<ConfigSpec> {
        self.read_snapshot().configs.get(name).cloned()
    }

    /// Returns the named layer spec from the current snapshot, if any.
    #[must_use]
    pub fn get_layer(&self, name: &str) -> Option<ConfigSpec> {
        self.read_snapshot().layers.get(name).cloned()
    }

    /// Returns the layer name the named experiment belongs to, if any.
    #[must_use]
    pub fn get_layer_for_experiment(&self, experiment: &str) -> Option<String> {
        self.read_snapshot().experiment_to_layer.get(experiment).map(|layer| layer.as_str().to_string())
    }

    /// Returns a clone of the named ID list's current state, if tracked.
    #[must_use]
    pub fn get_id_list(&self, name: &str) -> Option<IdList> {
        let lists = self.id_lists.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        lists.get(&IdListName::new(name)).cloned()
    }

    /// Whether the store has a usable snapshot and may answer evaluation
    /// requests. `false` until the first successful sync from any source.
    #[must_use]
    pub fn is_serving_checks(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Returns which source produced the current snapshot.
    #[must_use]
    pub fn get_init_reason(&self) -> InitReason {
        *self.init_reason.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the current snapshot's declared update time.
    #[must_use]
    pub fn get_last_update_time(&self) -> Timestamp {
        self.read_snapshot().last_update_time
    }

    fn read_snapshot(&self) -> Arc<ConfigStore> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Runs the adapter → bootstrap → network fan-in, then spawns both
    /// steady-state polling loops unless polling is disabled.
    ///
    /// Every step's failure is logged and does not abort the remaining
    /// steps; the store is left not-serving only if every
    /// step failed.
    pub async fn init(self: &Arc<Self>) {
        let adapter_succeeded = self.try_init_from_adapter().await;

        if self.get_init_reason() == InitReason::Uninitialized {
            self.try_init_from_bootstrap();
        } else if adapter_succeeded && self.config.bootstrap_values.is_some() {
            tracing::info!("statsig: bootstrap values supplied but data adapter already produced a snapshot; adapter wins");
        }

        if self.get_init_reason() == InitReason::Uninitialized {
            self.try_init_from_network().await;
        }

        match self.config.id_list_init_strategy {
            IdListInitStrategy::None => {}
            IdListInitStrategy::Lazy => {}
            IdListInitStrategy::Sync => {
                if let Err(cause) = self.sync_id_lists_tick().await {
                    tracing::debug!(cause = %cause, "statsig: synchronous id list init failed");
                }
            }
        }

        if !self.config.disable_all_polling {
            self.rulesets_loop.spawn(self.rulesets_tick_fn());
            self.id_list_loop.spawn(self.id_list_tick_fn());
        }
    }

    async fn try_init_from_adapter(&self) -> bool {
        let Some(adapter) = self.adapter.clone() else { return false };
        if let Err(err) = adapter.initialize().await {
            tracing::debug!(error = %err, "statsig: data adapter initialize failed");
            return false;
        }
        match adapter.get(&AdapterKeyName::rulesets()).await {
            Ok(Some(bytes)) => match self.apply_response(&bytes, InitReason::DataAdapter) {
                Ok(true) => true,
                Ok(false) => false,
                Err(err) => {
                    tracing::debug!(error = %err, "statsig: data adapter rulesets value rejected");
                    false
                }
            },
            Ok(None) => false,
            Err(err) => {
                tracing::debug!(error = %err, "statsig: data adapter get(rulesets) failed");
                false
            }
        }
    }

    fn try_init_from_bootstrap(&self) {
        let Some(bootstrap) = self.config.bootstrap_values.clone() else { return };
        match self.apply_response(&bootstrap, InitReason::Bootstrap) {
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "statsig: bootstrap values rejected"),
        }
    }

    async fn try_init_from_network(&self) {
        let fetch = self.fetcher.fetch_config_specs(None);
        let outcome = tokio::time::timeout(self.config.init_timeout, fetch).await;
        match outcome {
            Ok(Ok(response)) => match self.apply_response(&response.body, InitReason::Network) {
                Ok(true) => self.save_through(&response.body).await,
                Ok(false) | Err(_) => {}
            },
            Ok(Err(err)) => tracing::error!(error = %err, "statsig: network init fetch failed"),
            Err(_) => tracing::error!(timeout_ms = self.config.init_timeout.as_millis(), "statsig: network init fetch timed out"),
        }
    }

    // ------------------------------------------------------------------
    // Snapshot application
    // ------------------------------------------------------------------

    /// Parses and validates `body`, publishing it as the new snapshot on
    /// success. Returns `Ok(true)` when a new snapshot was published,
    /// `Ok(false)` when the payload declared no updates.
    fn apply_response(&self, body: &[u8], source: InitReason) -> Result<bool, ConfigStoreBuildError> {
        match ConfigStore::build_from_response(body)? {
            crate::core::config_store::ProcessOutcome::NoUpdates => Ok(false),
            crate::core::config_store::ProcessOutcome::Updated(mut store) => {
                let current_time = self.read_snapshot().last_update_time;
                if store.last_update_time < current_time {
                    store.last_update_time = current_time;
                }
                self.publish(store, source);
                Ok(true)
            }
        }
    }

    fn publish(&self, store: ConfigStore, source: InitReason) {
        {
            let mut guard = self.snapshot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = Arc::new(store);
        }
        self.serving.store(true, Ordering::SeqCst);
        let mut reason = self.init_reason.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *reason == InitReason::Uninitialized {
            *reason = source;
        } else if source == InitReason::Network {
            *reason = InitReason::Network;
        }
        self.diagnostics.mark(DiagnosticsMarker { key: "dcs", step: "end", success: Some(true) });
    }

    async fn save_through(&self, body: &[u8]) {
        let Some(adapter) = &self.adapter else { return };
        let time = self.get_last_update_time();
        if let Err(err) = adapter.set(&AdapterKeyName::rulesets(), body.to_vec(), time).await {
            tracing::debug!(error = %err, "statsig: ruleset save-through to data adapter failed");
        }
    }

    // ------------------------------------------------------------------
    // Steady-state polling ticks
    // ------------------------------------------------------------------

    fn rulesets_tick_fn(self: &Arc<Self>) -> TickFn {
        let store = Arc::clone(self);
        Arc::new(move || {
            let store = Arc::clone(&store);
            Box::pin(async move { store.sync_rulesets_tick().await })
        })
    }

    fn id_list_tick_fn(self: &Arc<Self>) -> TickFn {
        let store = Arc::clone(self);
        Arc::new(move || {
            let store = Arc::clone(&store);
            Box::pin(async move { store.sync_id_lists_tick().await })
        })
    }

    /// One ruleset polling tick: adapter if it advertises steady-state
    /// polling support for rulesets, else network. No cross-fallback within
    /// a single tick.
    async fn sync_rulesets_tick(&self) -> Result<(), String> {
        if let Some(adapter) = &self.adapter {
            if adapter.supports_polling_updates_for(PollingResource::Rulesets) {
                return match adapter.get(&AdapterKeyName::rulesets()).await {
                    Ok(Some(bytes)) => self
                        .apply_response(&bytes, InitReason::DataAdapter)
                        .map(|_| ())
                        .map_err(|err| err.to_string()),
                    Ok(None) => Ok(()),
                    Err(err) => Err(err.to_string()),
                };
            }
        }

        let response = self.fetcher.fetch_config_specs(Some(self.get_last_update_time())).await.map_err(|err| err.to_string())?;
        let updated = self.apply_response(&response.body, InitReason::Network).map_err(|err| err.to_string())?;
        if updated {
            self.save_through(&response.body).await;
        }
        Ok(())
    }

    /// One ID list polling tick: adapter if it advertises steady-state
    /// polling support for ID lists; on adapter error, fall back to network
    /// for this tick only.
    async fn sync_id_lists_tick(&self) -> Result<(), String> {
        let body = self.fetch_id_list_index_body().await?;

        let index: IdListIndex = serde_json::from_slice(&body).map_err(|err| err.to_string())?;
        let lookup: BTreeMap<String, ListLookupEntry> = index
            .into_iter()
            .map(|(name, entry)| {
                (
                    name,
                    ListLookupEntry {
                        url: entry.url,
                        file_id: entry.file_id,
                        size: entry.size,
                        creation_time: entry.creation_time,
                    },
                )
            })
            .collect();

        let fetch_tasks = {
            let mut lists = self.id_lists.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            apply_lookup(&mut lists, &lookup)
        };

        let mut join_set = tokio::task::JoinSet::new();
        for task in fetch_tasks {
            let fetcher = Arc::clone(&self.fetcher);
            join_set.spawn(async move {
                let result = fetcher.fetch_id_list_range(&task.url, task.range_start).await;
                (task.name, result)
            });
        }

        let mut last_error: Option<String> = None;
        while let Some(joined) = join_set.join_next().await {
            let Ok((name, result)) = joined else { continue };
            match result {
                Ok(response) => {
                    let body_str = String::from_utf8_lossy(&response.body).into_owned();
                    let mut lists = self.id_lists.write().unwrap_or_else(std::sync::PoisonError::into_inner);
                    if let Err(err) = apply_fetch_result(&mut lists, &name, &body_str, response.content_length) {
                        last_error = Some(err.to_string());
                    }
                }
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        self.save_id_lists_through().await;

        last_error.map_or(Ok(()), Err)
    }

    async fn fetch_id_list_index_body(&self) -> Result<Vec<u8>, String> {
        if let Some(adapter) = &self.adapter {
            if adapter.supports_polling_updates_for(PollingResource::IdLists) {
                match adapter.get(&AdapterKeyName::id_lists()).await {
                    Ok(Some(bytes)) => return Ok(bytes),
                    Ok(None) => {}
                    Err(err) => tracing::debug!(error = %err, "statsig: id list adapter lookup failed, falling back to network for this tick"),
                }
            }
        }
        let response = self.fetcher.fetch_id_list_index().await.map_err(|err| err.to_string())?;
        Ok(response.body)
    }

    async fn save_id_lists_through(&self) {
        let Some(adapter) = &self.adapter else { return };
        let lists = self.id_lists.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        for (name, list) in lists.iter() {
            let Ok(bytes) = serde_json::to_vec(&list.to_snapshot()) else { continue };
            if let Err(err) = adapter.set(&AdapterKeyName::id_list(name), bytes, list.creation_time).await {
                tracing::debug!(error = %err, list = %name, "statsig: id list save-through failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Watchdog
    // ------------------------------------------------------------------

    /// Checks both polling loops' liveness; a loop whose last tick is older
    /// than `max(120_000ms, period)` is cleared and rescheduled. Returns
    /// `None` when both loops were alive.
    pub fn reset_sync_timer_if_exited(self: &Arc<Self>) -> Option<WatchdogResetReport> {
        let now = Instant::now();
        let rulesets_reset = if self.rulesets_loop.is_alive(now, self.started_at) {
            false
        } else {
            self.rulesets_loop.reschedule(self.rulesets_tick_fn());
            true
        };
        let id_lists_reset = if self.id_list_loop.is_alive(now, self.started_at) {
            false
        } else {
            self.id_list_loop.reschedule(self.id_list_tick_fn());
            true
        };
        if rulesets_reset || id_lists_reset {
            Some(WatchdogResetReport { rulesets_reset, id_lists_reset })
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Stops both timers immediately and flushes the adapter. In-flight
    /// ticks are not cancelled; their side effects are harmless.
    pub async fn shutdown(&self) {
        self.rulesets_loop.shutdown();
        self.id_list_loop.shutdown();
        if let Some(adapter) = &self.adapter {
            adapter.shutdown().await;
        }
    }

    /// As [`SpecStore::shutdown`], additionally awaiting each loop's last
    /// in-flight tick before returning.
    pub async fn shutdown_async(&self) {
        self.rulesets_loop.shutdown_async().await;
        self.id_list_loop.shutdown_async().await;
        if let Some(adapter) = &self.adapter {
            adapter.shutdown().await;
        }
    }
}

fn config_or_default_period(period: &Duration) -> Duration {
    if period.is_zero() { Duration::from_secs(10) } else { *period }
}

// ============================================================================
// SECTION: Evaluator Glue
// ============================================================================

impl GateResolver for SpecStore {
    fn evaluate_gate(
        &self,
        name: &str,
        user: &StatsigUser,
        depth: u32,
    ) -> Result<(bool, Vec<SecondaryExposure>), EvalError> {
        let spec = self.get_gate(name).ok_or_else(|| EvalError::UnknownSpec(name.to_string()))?;
        let ctx = ConditionContext {
            gate_resolver: Some(self),
            ip_locator: self.ip_locator.as_deref(),
            ua_parser: self.ua_parser.as_deref(),
        };
        let decision = evaluate_spec(&spec, user, &ctx, Some(self), depth)?;
        let passed = decision.value.as_bool().unwrap_or(false);
        let mut exposures = decision.secondary_exposures;
        exposures.push(SecondaryExposure::new(name, passed, decision.rule_id.as_str()));
        Ok((passed, exposures))
    }
}

impl DelegateResolver for SpecStore {
    fn evaluate_delegate(&self, name: &str, user: &StatsigUser) -> Result<Decision, EvalError> {
        let spec = self
            .get_config(name)
            .or_else(|| self.get_gate(name))
            .ok_or_else(|| EvalError::UnknownSpec(name.to_string()))?;
        let ctx = ConditionContext {
            gate_resolver: Some(self),
            ip_locator: self.ip_locator.as_deref(),
            ua_parser: self.ua_parser.as_deref(),
        };
        evaluate_spec(&spec, user, &ctx, Some(self), 0)
    }
}

impl SpecStore {
    /// Evaluates the named gate against `user` using the current snapshot,
    /// recursing through `pass_gate`/`fail_gate` conditions and layer
    /// delegation via this store's own [`GateResolver`]/[`DelegateResolver`]
    /// implementations.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownSpec`] when no such gate exists, or
    /// [`EvalError::RecursionDepthExceeded`] on a runaway gate chain.
    pub fn evaluate_gate_decision(&self, name: &str, user: &StatsigUser) -> Result<Decision, EvalError> {
        let spec = self.get_gate(name).ok_or_else(|| EvalError::UnknownSpec(name.to_string()))?;
        let ctx = ConditionContext {
            gate_resolver: Some(self),
            ip_locator: self.ip_locator.as_deref(),
            ua_parser: self.ua_parser.as_deref(),
        };
        evaluate_spec(&spec, user, &ctx, Some(self), 0)
    }

    /// Evaluates the named dynamic config against `user`, per
    /// [`SpecStore::evaluate_gate_decision`] but reading from `configs`.
    ///
    /// # Errors
    ///
    /// See [`SpecStore::evaluate_gate_decision`].
    pub fn evaluate_config_decision(&self, name: &str, user: &StatsigUser) -> Result<Decision, EvalError> {
        let spec = self.get_config(name).ok_or_else(|| EvalError::UnknownSpec(name.to_string()))?;
        let ctx = ConditionContext {
            gate_resolver: Some(self),
            ip_locator: self.ip_locator.as_deref(),
            ua_parser: self.ua_parser.as_deref(),
        };
        evaluate_spec(&spec, user, &ctx, Some(self), 0)
    }

    /// Evaluates the named layer against `user`, delegating to its
    /// experiment via `configDelegate` when the deciding rule names one.
    ///
    /// # Errors
    ///
    /// See [`SpecStore::evaluate_gate_decision`].
    pub fn evaluate_layer_decision(&self, name: &str, user: &StatsigUser) -> Result<Decision, EvalError> {
        let spec = self.get_layer(name).ok_or_else(|| EvalError::UnknownSpec(name.to_string()))?;
        let ctx = ConditionContext {
            gate_resolver: Some(self),
            ip_locator: self.ip_locator.as_deref(),
            ua_parser: self.ua_parser.as_deref(),
        };
        evaluate_spec(&spec, user, &ctx, Some(self), 0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::FetchResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    fn specs_payload(time: i64, rule_pass_percentage: f64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "has_updates": true,
            "time": time,
            "feature_gates": [{
                "name": "nfl",
                "type": "feature_gate",
                "salt": "na",
                "enabled": true,
                "defaultValue": false,
                "rules": [{
                    "id": "rule_id_gate",
                    "passPercentage": rule_pass_percentage,
                    "conditions": [{
                        "type": "user_field",
                        "field": "email",
                        "operator": "str_contains_any",
                        "targetValue": ["packers.com", "nfl.com"],
                    }],
                    "returnValue": true,
                }],
            }],
            "dynamic_configs": [],
            "layer_configs": [],
            "layers": {},
            "sdk_keys_to_app_ids": {},
            "diagnostics": {},
        }))
        .unwrap()
    }

    struct FakeFetcher {
        network_calls: AtomicU32,
        specs: Vec<u8>,
        fail: bool,
    }

    impl FakeFetcher {
        fn new(specs: Vec<u8>) -> Self {
            Self { network_calls: AtomicU32::new(0), specs, fail: false }
        }

        fn failing() -> Self {
            Self { network_calls: AtomicU32::new(0), specs: Vec::new(), fail: true }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch_config_specs(&self, _since: Option<Timestamp>) -> Result<FetchResponse, FetchError> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Transport("boom".to_string()));
            }
            Ok(FetchResponse { body: self.specs.clone(), content_length: Some(self.specs.len() as u64), not_modified: false })
        }

        async fn fetch_id_list_index(&self) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse { body: b"{}".to_vec(), content_length: Some(2), not_modified: false })
        }

        async fn fetch_id_list_range(&self, _url: &str, _range_start: u64) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse { body: Vec::new(), content_length: Some(0), not_modified: false })
        }

        async fn post_exception(&self, _payload: &[u8]) {}
    }

    #[derive(Default)]
    struct FakeAdapter {
        rulesets: Mutex<Option<Vec<u8>>>,
        supports_polling: bool,
        last_set_time: Mutex<Option<Timestamp>>,
    }

    #[async_trait]
    impl DataAdapter for FakeAdapter {
        async fn initialize(&self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn shutdown(&self) {}

        async fn get(&self, key: &AdapterKeyName) -> Result<Option<Vec<u8>>, AdapterError> {
            if key.as_str() == AdapterKeyName::rulesets().as_str() {
                return Ok(self.rulesets.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone());
            }
            Ok(None)
        }

        async fn set(&self, key: &AdapterKeyName, value: Vec<u8>, time: Timestamp) -> Result<(), AdapterError> {
            if key.as_str() == AdapterKeyName::rulesets().as_str() {
                *self.rulesets.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(value);
            }
            *self.last_set_time.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(time);
            Ok(())
        }

        fn supports_polling_updates_for(&self, _resource: PollingResource) -> bool {
            self.supports_polling
        }
    }

    fn disabled_polling_config() -> SpecStoreConfig {
        SpecStoreConfig { disable_all_polling: true, id_list_init_strategy: IdListInitStrategy::None, ..SpecStoreConfig::default() }
    }

    #[tokio::test]
    async fn init_from_network_serves_and_evaluates() {
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(1000, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher, None, disabled_polling_config()));
        store.init().await;

        assert!(store.is_serving_checks());
        assert_eq!(store.get_init_reason(), InitReason::Network);
        assert_eq!(store.get_last_update_time(), Timestamp::from_millis(1000));

        let user = StatsigUser { email: Some("tore@packers.com".to_string()), ..StatsigUser::with_user_id("u1") };
        let decision = store.evaluate_gate_decision("nfl", &user).unwrap();
        assert_eq!(decision.value, json!(true));
        assert_eq!(decision.rule_id.as_str(), "rule_id_gate");
    }

    #[tokio::test]
    async fn unmatched_user_gets_default_value() {
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(1000, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher, None, disabled_polling_config()));
        store.init().await;

        let user = StatsigUser::with_user_id("u1");
        let decision = store.evaluate_gate_decision("nfl", &user).unwrap();
        assert_eq!(decision.value, json!(false));
        assert_eq!(decision.rule_id.as_str(), "default");
    }

    #[tokio::test]
    async fn adapter_snapshot_wins_over_network_at_init() {
        let adapter = Arc::new(FakeAdapter { rulesets: Mutex::new(Some(specs_payload(500, 100.0))), supports_polling: false });
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(9999, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher.clone(), Some(adapter), disabled_polling_config()));
        store.init().await;

        assert_eq!(store.get_init_reason(), InitReason::DataAdapter);
        assert_eq!(store.get_last_update_time(), Timestamp::from_millis(500));
        assert_eq!(fetcher.network_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bootstrap_used_when_no_adapter_value_present() {
        let mut config = disabled_polling_config();
        config.bootstrap_values = Some(specs_payload(42, 100.0));
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(9999, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher.clone(), None, config));
        store.init().await;

        assert_eq!(store.get_init_reason(), InitReason::Bootstrap);
        assert_eq!(store.get_last_update_time(), Timestamp::from_millis(42));
        assert_eq!(fetcher.network_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn network_failure_leaves_store_not_serving() {
        let fetcher = Arc::new(FakeFetcher::failing());
        let store = Arc::new(SpecStore::new(fetcher, None, disabled_polling_config()));
        store.init().await;

        assert!(!store.is_serving_checks());
        assert_eq!(store.get_init_reason(), InitReason::Uninitialized);
    }

    #[tokio::test]
    async fn steady_state_network_sync_updates_init_reason_to_network() {
        let adapter = Arc::new(FakeAdapter { rulesets: Mutex::new(Some(specs_payload(10, 100.0))), supports_polling: false });
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(20, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher, Some(adapter), disabled_polling_config()));
        store.init().await;
        assert_eq!(store.get_init_reason(), InitReason::DataAdapter);

        store.sync_rulesets_tick().await.unwrap();
        assert_eq!(store.get_init_reason(), InitReason::Network);
        assert_eq!(store.get_last_update_time(), Timestamp::from_millis(20));
    }

    #[tokio::test]
    async fn save_through_writes_network_response_to_adapter() {
        let adapter = Arc::new(FakeAdapter::default());
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(7, 100.0)));
        let store = Arc::new(SpecStore::new(fetcher, Some(adapter.clone()), disabled_polling_config()));
        store.init().await;

        let saved = adapter.get(&AdapterKeyName::rulesets()).await.unwrap();
        assert!(saved.is_some());
        assert_eq!(
            *adapter.last_set_time.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            Some(Timestamp::from_millis(7))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_reschedules_dead_timer() {
        let fetcher = Arc::new(FakeFetcher::new(specs_payload(1, 100.0)));
        let mut config = SpecStoreConfig::default();
        config.rulesets_sync_interval = Duration::from_millis(10);
        config.id_list_sync_interval = Duration::from_millis(10);
        config.id_list_init_strategy = IdListInitStrategy::None;
        let store = Arc::new(SpecStore::new(fetcher, None, config));
        store.init().await;

        tokio::time::advance(Duration::from_secs(200)).await;
        let report = store.reset_sync_timer_if_exited();
        assert!(report.is_some());
        store.shutdown().await;
    }

    #[tokio::test]
    async fn id_list_sync_tracks_membership() {
        struct ListFetcher;
        #[async_trait]
        impl Fetcher for ListFetcher {
            async fn fetch_config_specs(&self, _since: Option<Timestamp>) -> Result<FetchResponse, FetchError> {
                Ok(FetchResponse { body: specs_payload(1, 100.0), content_length: None, not_modified: false })
            }
            async fn fetch_id_list_index(&self) -> Result<FetchResponse, FetchError> {
                let body = serde_json::to_vec(&json!({
                    "employees": {"url": "https://x/employees", "fileID": "file-1", "size": 4, "creationTime": 10}
                }))
                .unwrap();
                Ok(FetchResponse { body, content_length: None, not_modified: false })
            }
            async fn fetch_id_list_range(&self, _url: &str, _range_start: u64) -> Result<FetchResponse, FetchError> {
                Ok(FetchResponse { body: b"+abc\n".to_vec(), content_length: Some(5), not_modified: false })
            }
            async fn post_exception(&self, _payload: &[u8]) {}
        }

        let store = Arc::new(SpecStore::new(Arc::new(ListFetcher), None, disabled_polling_config()));
        store.init().await;
        store.sync_id_lists_tick().await.unwrap();

        let list = store.get_id_list("employees").unwrap();
        assert!(list.contains("abc"));
        assert_eq!(list.read_bytes, 5);
    }
}
