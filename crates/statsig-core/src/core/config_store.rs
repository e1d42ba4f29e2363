// statsig-core/src/core/config_store.rs
// ============================================================================
// Module: Statsig Core Config Store
// Description: Owned mapping of gates/configs/layers built from one sync.
// Purpose: Parse and validate a config-specs payload into the snapshot the
//          spec store atomically publishes.
// Dependencies: crate::core::spec, crate::core::time, serde_json
// ============================================================================

//! ## Overview
//! `ConfigStore` is the bundle of mappings one successful sync produces:
//! gates, configs, layers, the inverted experiment→layer map, the client SDK
//! key→app id map, and diagnostics sampling rates. Building a new store is a
//! pure function of the raw server payload; it either fully succeeds or
//! fails closed, so the spec store never publishes a partially-applied
//! snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::AppId;
use crate::core::identifiers::ClientSdkKey;
use crate::core::identifiers::ConfigName;
use crate::core::identifiers::ExperimentName;
use crate::core::identifiers::GateName;
use crate::core::identifiers::LayerName;
use crate::core::spec::ConfigSpec;
use crate::core::spec::SpecError;
use crate::core::spec::SpecKind;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Sampling Rates
// ============================================================================

/// Upper bound diagnostics sampling rates are clamped to on ingress.
pub const MAX_SAMPLING_RATE: u32 = 10_000;

/// Diagnostics sampling rates published alongside a config-specs sync.
/// Consulted by a host application's diagnostics sampler; the core never
/// interprets these values itself (diagnostics-sampling non-goal).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingRates {
    /// Sampling rate for the `dcs` (download config specs) marker.
    pub dcs: u32,
    /// Sampling rate for the `log` marker.
    pub log: u32,
    /// Sampling rate for the `idlist` marker.
    pub idlist: u32,
    /// Sampling rate for the `initialize` marker.
    pub initialize: u32,
}

impl SamplingRates {
    fn from_raw(raw: &DiagnosticsRaw) -> Self {
        Self {
            dcs: clamp_rate(raw.dcs),
            log: clamp_rate(raw.log),
            idlist: clamp_rate(raw.idlist),
            initialize: clamp_rate(raw.initialize),
        }
    }
}

fn clamp_rate(value: Option<f64>) -> u32 {
    let Some(value) = value else { return 0 };
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is finite and non-negative here; truncation only ever lowers toward MAX_SAMPLING_RATE"
    )]
    let scaled = value.min(f64::from(MAX_SAMPLING_RATE)) as u32;
    scaled.min(MAX_SAMPLING_RATE)
}

#[derive(Debug, Default, Deserialize)]
struct DiagnosticsRaw {
    #[serde(default)]
    dcs: Option<f64>,
    #[serde(default)]
    log: Option<f64>,
    #[serde(default)]
    idlist: Option<f64>,
    #[serde(default)]
    initialize: Option<f64>,
}

// ============================================================================
// SECTION: Raw Response Shape
// ============================================================================

/// Raw shape of the config-specs endpoint response, deserialized
/// loosely so the three spec arrays can be validated individually before any
/// element is parsed into a [`ConfigSpec`].
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    has_updates: bool,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    feature_gates: Value,
    #[serde(default)]
    dynamic_configs: Value,
    #[serde(default)]
    layer_configs: Value,
    #[serde(default)]
    layers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    sdk_keys_to_app_ids: BTreeMap<String, String>,
    #[serde(default)]
    diagnostics: DiagnosticsRaw,
}

// ============================================================================
// SECTION: Config Store
// ============================================================================

/// The live, atomically-replaced snapshot of gates, configs, and layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    /// Feature gates keyed by name.
    pub gates: HashMap<GateName, ConfigSpec>,
    /// Dynamic configs keyed by name.
    pub configs: HashMap<ConfigName, ConfigSpec>,
    /// Layers keyed by name.
    pub layers: HashMap<LayerName, ConfigSpec>,
    /// Inverted `layers` mapping: experiment name → owning layer name.
    pub experiment_to_layer: HashMap<ExperimentName, LayerName>,
    /// Client SDK key → application id, for multi-app projects.
    pub client_sdk_key_to_app_map: HashMap<ClientSdkKey, AppId>,
    /// Diagnostics sampling rates published with this snapshot.
    pub sampling_rates: SamplingRates,
    /// The payload's own declared update time.
    pub last_update_time: Timestamp,
}

/// Outcome of attempting to build a new [`ConfigStore`] from a raw payload.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// `has_updates` was `false`; the caller should keep its current snapshot.
    NoUpdates,
    /// A new snapshot was built and validated; the caller should publish it.
    Updated(ConfigStore),
}

/// Errors building a [`ConfigStore`] from a raw payload.
#[derive(Debug, Error)]
pub enum ConfigStoreBuildError {
    /// The response body was not valid JSON, or was missing required shape.
    #[error("failed to parse config specs response: {0}")]
    MalformedResponse(String),
    /// One of the three top-level spec arrays was present but not a sequence.
    #[error("config specs response field {0} is not an array")]
    MalformedTopLevelArray(&'static str),
    /// A single spec failed construction/validation.
    #[error("config spec rejected: {0}")]
    Spec(#[from] SpecError),
}

impl ConfigStore {
    /// Parses, validates, and builds a new snapshot from a raw config-specs
    /// response body.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreBuildError`] when the payload is malformed or any
    /// individual spec fails validation; this must reject
    /// the *entire* snapshot rather than applying a partial one.
    pub fn build_from_response(body: &[u8]) -> Result<ProcessOutcome, ConfigStoreBuildError> {
        let raw: RawResponse = serde_json::from_slice(body)
            .map_err(|err| ConfigStoreBuildError::MalformedResponse(err.to_string()))?;

        if !raw.has_updates {
            return Ok(ProcessOutcome::NoUpdates);
        }

        let gates = parse_spec_array(raw.feature_gates, "feature_gates", SpecKind::FeatureGate)?;
        let configs = parse_spec_array(raw.dynamic_configs, "dynamic_configs", SpecKind::DynamicConfig)?;
        let layers = parse_spec_array(raw.layer_configs, "layer_configs", SpecKind::Layer)?;

        let mut experiment_to_layer = HashMap::new();
        for (layer_name, experiments) in &raw.layers {
            for experiment in experiments {
                experiment_to_layer.insert(ExperimentName::new(experiment.clone()), LayerName::new(layer_name.clone()));
            }
        }

        let client_sdk_key_to_app_map = raw
            .sdk_keys_to_app_ids
            .into_iter()
            .map(|(key, app)| (ClientSdkKey::new(key), AppId::new(app)))
            .collect();

        let store = Self {
            gates: index_by_name(gates),
            configs: index_by_name(configs),
            layers: index_by_name(layers),
            experiment_to_layer,
            client_sdk_key_to_app_map,
            sampling_rates: SamplingRates::from_raw(&raw.diagnostics),
            last_update_time: Timestamp::from_millis(raw.time),
        };
        Ok(ProcessOutcome::Updated(store))
    }
}

fn parse_spec_array(
    value: Value,
    field: &'static str,
    expected_kind: SpecKind,
) -> Result<Vec<ConfigSpec>, ConfigStoreBuildError> {
    let Value::Array(items) = value else {
        return Err(ConfigStoreBuildError::MalformedTopLevelArray(field));
    };
    items
        .into_iter()
        .map(|item| parse_one_spec(item, expected_kind))
        .collect()
}

fn parse_one_spec(item: Value, expected_kind: SpecKind) -> Result<ConfigSpec, ConfigStoreBuildError> {
    let mut spec: ConfigSpec = serde_json::from_value(item)
        .map_err(|err| ConfigStoreBuildError::Spec(SpecError::Deserialize(err.to_string())))?;
    spec.kind = expected_kind;
    let spec = spec.validate_and_normalize()?;
    Ok(inherit_rule_salts(spec))
}

/// Applies rule/spec salt inheritance: a rule without its own
/// salt uses the spec's.
fn inherit_rule_salts(mut spec: ConfigSpec) -> ConfigSpec {
    for rule in &mut spec.rules {
        if rule.salt.is_none() {
            rule.salt = Some(spec.salt.clone());
        }
    }
    spec
}

fn index_by_name<K: From<String> + std::hash::Hash + Eq>(specs: Vec<ConfigSpec>) -> HashMap<K, ConfigSpec> {
    specs.into_iter().map(|spec| (K::from(spec.name.clone()), spec)).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_response(has_updates: bool) -> Value {
        json!({
            "has_updates": has_updates,
            "time": 1000,
            "feature_gates": [{
                "name": "nfl",
                "type": "feature_gate",
                "salt": "na",
                "enabled": true,
                "defaultValue": false,
                "rules": [],
            }],
            "dynamic_configs": [],
            "layer_configs": [],
            "layers": {"a_layer": ["exp_1"]},
            "sdk_keys_to_app_ids": {"client-abc": "app-1"},
            "diagnostics": {"dcs": 10000, "log": -5, "idlist": 500.7, "initialize": 1},
        })
    }

    #[test]
    fn has_updates_false_yields_no_updates() {
        let body = serde_json::to_vec(&minimal_response(false)).unwrap();
        let outcome = ConfigStore::build_from_response(&body).unwrap();
        assert!(matches!(outcome, ProcessOutcome::NoUpdates));
    }

    #[test]
    fn valid_response_builds_indexed_store_and_inverts_layers() {
        let body = serde_json::to_vec(&minimal_response(true)).unwrap();
        let ProcessOutcome::Updated(store) = ConfigStore::build_from_response(&body).unwrap() else {
            panic!("expected Updated");
        };
        assert!(store.gates.contains_key("nfl"));
        assert_eq!(store.experiment_to_layer.get("exp_1"), Some(&LayerName::new("a_layer")));
        assert_eq!(store.client_sdk_key_to_app_map.get("client-abc"), Some(&AppId::new("app-1")));
        assert_eq!(store.last_update_time, Timestamp::from_millis(1000));
        assert_eq!(store.sampling_rates.dcs, MAX_SAMPLING_RATE);
        assert_eq!(store.sampling_rates.log, 0);
        assert_eq!(store.sampling_rates.idlist, 500);
    }

    #[test]
    fn non_array_top_level_field_is_rejected() {
        let mut body = minimal_response(true);
        body["feature_gates"] = json!({"not": "an array"});
        let body = serde_json::to_vec(&body).unwrap();
        let err = ConfigStore::build_from_response(&body).unwrap_err();
        assert!(matches!(err, ConfigStoreBuildError::MalformedTopLevelArray("feature_gates")));
    }

    #[test]
    fn invalid_spec_rejects_whole_snapshot() {
        let mut body = minimal_response(true);
        body["feature_gates"][0]["name"] = json!("");
        let body = serde_json::to_vec(&body).unwrap();
        let err = ConfigStore::build_from_response(&body).unwrap_err();
        assert!(matches!(err, ConfigStoreBuildError::Spec(SpecError::MissingName)));
    }

    #[test]
    fn rule_without_salt_inherits_spec_salt() {
        let mut body = minimal_response(true);
        body["feature_gates"][0]["rules"] = json!([{
            "id": "rule_1",
            "passPercentage": 50.0,
            "conditions": [],
            "returnValue": true,
        }]);
        let body = serde_json::to_vec(&body).unwrap();
        let ProcessOutcome::Updated(store) = ConfigStore::build_from_response(&body).unwrap() else {
            panic!("expected Updated");
        };
        let rule = &store.gates["nfl"].rules[0];
        assert_eq!(rule.salt.as_deref(), Some("na"));
    }
}
