// statsig-core/src/core/spec.rs
// ============================================================================
// Module: Statsig Core Config Spec
// Description: Gate/config/layer specification and validation.
// Purpose: Define the canonical parsed, validated representation of a spec.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `ConfigSpec` is the parsed, validated representation of a feature gate,
//! dynamic config, or layer. Specs are untrusted server payloads; the
//! constructor re-validates required fields on ingress. Construction failure
//! is a hard error that causes the whole snapshot to be rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::RuleId;

// ============================================================================
// SECTION: Spec Kind
// ============================================================================

/// The three kinds of config spec the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    /// A boolean feature gate.
    FeatureGate,
    /// A JSON-valued dynamic config.
    DynamicConfig,
    /// A layer grouping experiments.
    Layer,
}

// ============================================================================
// SECTION: Condition
// ============================================================================

/// A single rule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, e.g. `public`, `user_field`, `pass_gate`.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Target value compared against the resolved field.
    #[serde(rename = "targetValue", default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Value>,
    /// Operator applied between the field value and `targetValue`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Field name read from the user context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Additional operator-specific values.
    #[serde(rename = "additionalValues", default)]
    pub additional_values: serde_json::Map<String, Value>,
    /// Unit id type used for bucketing-style conditions (`user_bucket`, `unit_id`).
    #[serde(rename = "idType", default, skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// A single ordered rule within a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable rule identifier, surfaced as `ruleID` on every decision it produces.
    pub id: RuleId,
    /// Human-readable rule name.
    #[serde(default)]
    pub name: String,
    /// Percentage of bucketed traffic that passes this rule, in `[0, 100]`.
    #[serde(rename = "passPercentage")]
    pub pass_percentage: f64,
    /// Ordered conditions; all must match for the rule to be considered.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Value returned when this rule passes.
    #[serde(rename = "returnValue")]
    pub return_value: Value,
    /// Salt used for bucketing; inherits the spec's salt when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Unit id type used for bucketing, defaults to `userID`.
    #[serde(rename = "idType", default, skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
    /// Experiment group name, present for experiment rules.
    #[serde(rename = "groupName", default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Layer-to-experiment delegation target.
    #[serde(rename = "configDelegate", default, skip_serializing_if = "Option::is_none")]
    pub config_delegate: Option<String>,
}

impl Rule {
    /// Returns the salt used for bucketing this rule: its own salt, else the
    /// rule id ("the rule's salt is the rule id unless the
    /// rule has its own salt").
    #[must_use]
    pub fn bucketing_salt(&self) -> &str {
        self.salt.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Returns the unit id type for this rule, falling back to the spec's.
    #[must_use]
    pub fn resolved_id_type<'a>(&'a self, spec_id_type: &'a str) -> &'a str {
        self.id_type.as_deref().unwrap_or(spec_id_type)
    }
}

// ============================================================================
// SECTION: ConfigSpec
// ============================================================================

/// A parsed, validated gate/config/layer specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpec {
    /// Spec name, unique within its kind.
    pub name: String,
    /// Spec kind.
    #[serde(rename = "type")]
    pub kind: SpecKind,
    /// Salt used for bucketing when a rule does not carry its own.
    pub salt: String,
    /// Whether the spec is enabled; disabled specs always return the default.
    pub enabled: bool,
    /// Default value returned when disabled, or when no rule matches/passes.
    #[serde(rename = "defaultValue")]
    pub default_value: Value,
    /// Ordered rules evaluated in sequence.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Unit id type, default `userID`.
    #[serde(rename = "idType", default = "default_id_type")]
    pub id_type: String,
    /// Entity kind, e.g. `experiment`, `holdout`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Explicit parameters declared by a layer.
    #[serde(rename = "explicitParameters", default)]
    pub explicit_parameters: BTreeSet<String>,
    /// Whether an experiment/layer is actively running.
    #[serde(rename = "isActive", default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Default `idType` when the server payload omits it.
fn default_id_type() -> String {
    "userID".to_string()
}

impl ConfigSpec {
    /// Validates and normalizes the spec, inheriting the spec salt onto any
    /// rule that does not declare its own.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when required fields are missing or malformed.
    pub fn validate_and_normalize(mut self) -> Result<Self, SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::MissingName);
        }
        for rule in &self.rules {
            if !(0.0..=100.0).contains(&rule.pass_percentage) {
                return Err(SpecError::InvalidPassPercentage {
                    spec: self.name.clone(),
                    rule: rule.id.to_string(),
                    value: rule.pass_percentage,
                });
            }
        }
        if self.id_type.trim().is_empty() {
            self.id_type = default_id_type();
        }
        Ok(self)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Spec validation errors.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Spec is missing a name.
    #[error("config spec is missing a name")]
    MissingName,
    /// A rule's `passPercentage` is outside `[0, 100]`.
    #[error("spec {spec} rule {rule} has invalid passPercentage {value}")]
    InvalidPassPercentage {
        /// Spec name.
        spec: String,
        /// Offending rule id.
        rule: String,
        /// Out-of-range value.
        value: f64,
    },
    /// The server payload's top-level arrays were not sequences.
    #[error("config specs response field {0} is not an array")]
    MalformedTopLevelArray(&'static str),
    /// Deserialization of a raw spec payload failed.
    #[error("failed to parse config spec: {0}")]
    Deserialize(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
