// statsig-core/src/core/exposure.rs
// ============================================================================
// Module: Statsig Core Secondary Exposures
// Description: Record of a nested gate evaluation surfaced alongside a decision.
// Purpose: Let callers see which gates a `pass_gate`/`fail_gate` chain touched.
// Dependencies: none
// ============================================================================

//! ## Overview
//! `pass_gate`/`fail_gate`/`multi_pass_gate`/`multi_fail_gate` conditions
//! recurse into another gate's evaluation. The inner decision is not just a
//! boolean: its gate name, resulting value, and rule id are accumulated as a
//! [`SecondaryExposure`] so the caller's exposure log can attribute the
//! outer decision to every gate it depended on.

use serde::Deserialize;
use serde::Serialize;

/// One nested gate evaluation contributing to an outer decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryExposure {
    /// Name of the gate that was evaluated.
    pub gate: String,
    /// String form of the inner gate's pass/fail outcome (`"true"`/`"false"`).
    #[serde(rename = "gateValue")]
    pub gate_value: String,
    /// Rule id that decided the inner gate's outcome.
    #[serde(rename = "ruleID")]
    pub rule_id: String,
}

impl SecondaryExposure {
    /// Builds a secondary exposure record from an inner gate's name, pass
    /// outcome, and deciding rule id.
    #[must_use]
    pub fn new(gate: impl Into<String>, passed: bool, rule_id: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            gate_value: passed.to_string(),
            rule_id: rule_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_value_serializes_as_lowercase_boolean_string() {
        let exposure = SecondaryExposure::new("nfl", true, "rule_id_gate");
        assert_eq!(exposure.gate_value, "true");
    }
}
