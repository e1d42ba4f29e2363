// statsig-core/src/runtime/rule_evaluator.rs
// ============================================================================
// Module: Statsig Runtime Rule Evaluator
// Description: Walks a spec's ordered rule list to produce a decision.
// Purpose: Implement the gate/config/layer evaluation algorithm.
// Dependencies: crate::core, crate::runtime::condition_evaluator
// ============================================================================

//! ## Overview
//! Rules are evaluated in order. The first rule whose conditions all match
//! decides the outcome: if that rule's bucketing check also passes, its
//! `returnValue` wins; if bucketing fails, evaluation stops there too — it
//! does **not** fall through to the next rule — but the default value is
//! returned instead of the rule's value. The rule id is surfaced either way,
//! so callers can always see which rule decided the exposure even when the
//! decision resolved to the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::ConfigSpec;
use crate::core::EvalError;
use crate::core::RuleId;
use crate::core::SecondaryExposure;
use crate::core::StatsigUser;
use crate::core::hashing;
use crate::runtime::condition_evaluator::ConditionContext;
use crate::runtime::condition_evaluator::evaluate_condition;

// ============================================================================
// SECTION: Sentinel Rule Ids
// ============================================================================

/// Rule id surfaced when the spec is disabled.
pub const DISABLED_RULE_ID: &str = "disabled";
/// Rule id surfaced when no rule matched.
pub const DEFAULT_RULE_ID: &str = "default";

// ============================================================================
// SECTION: Decision
// ============================================================================

/// The outcome of evaluating a spec for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// The value returned: the matching rule's `returnValue`, or the spec's
    /// `defaultValue` when disabled, unmatched, or bucketed out.
    pub value: Value,
    /// The rule id responsible for this decision, or a sentinel.
    pub rule_id: RuleId,
    /// Experiment group name, when the deciding rule carries one.
    pub group_name: Option<String>,
    /// Name of a layer-delegated experiment, when the deciding rule names one.
    pub config_delegate: Option<String>,
    /// Gate exposures accumulated from nested `pass_gate`/`fail_gate`
    /// conditions evaluated along the way, in evaluation order.
    pub secondary_exposures: Vec<SecondaryExposure>,
    /// Parameter names the caller is allowed to read directly off a layer,
    /// rather than through its delegated experiment.
    pub explicit_parameters: BTreeSet<String>,
    /// Whether the deciding experiment is currently active, when the spec
    /// carries an `isActive` flag.
    pub is_experiment_active: Option<bool>,
}

impl Decision {
    fn default_value(spec: &ConfigSpec, rule_id: &str, exposures: Vec<SecondaryExposure>) -> Self {
        Self {
            value: spec.default_value.clone(),
            rule_id: RuleId::new(rule_id),
            group_name: None,
            config_delegate: None,
            secondary_exposures: exposures,
            explicit_parameters: spec.explicit_parameters.clone(),
            is_experiment_active: spec.is_active,
        }
    }
}

// ============================================================================
// SECTION: Resolvers
// ============================================================================

/// Resolves a `configDelegate` layer-to-experiment substitution by
/// evaluating the named experiment spec as if it were being evaluated
/// directly.
pub trait DelegateResolver {
    /// Evaluates the named experiment for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownSpec`] when no such experiment exists.
    fn evaluate_delegate(&self, name: &str, user: &StatsigUser) -> Result<Decision, EvalError>;
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates `spec` for `user`.
///
/// # Errors
///
/// Returns [`EvalError`] when a `pass_gate`/`fail_gate` condition or a
/// `configDelegate` recurses past the depth guard, or references an unknown
/// spec.
pub fn evaluate_spec(
    spec: &ConfigSpec,
    user: &StatsigUser,
    condition_ctx: &ConditionContext<'_>,
    delegate_resolver: Option<&dyn DelegateResolver>,
    depth: u32,
) -> Result<Decision, EvalError> {
    if !spec.enabled {
        return Ok(Decision::default_value(spec, DISABLED_RULE_ID, Vec::new()));
    }

    for rule in &spec.rules {
        let mut exposures = Vec::new();
        if !conditions_match(rule, spec, user, condition_ctx, depth, &mut exposures)? {
            continue;
        }

        let id_type = rule.resolved_id_type(&spec.id_type);
        let Some(unit_id) = user.unit_id(id_type) else {
            return Ok(Decision::default_value(spec, rule.id.as_str(), exposures));
        };
        let key = hashing::pass_percentage_key(&spec.salt, rule.bucketing_salt(), unit_id);
        if !hashing::evaluate_pass_percentage(&key, rule.pass_percentage) {
            return Ok(Decision::default_value(spec, rule.id.as_str(), exposures));
        }

        if let Some(delegate) = &rule.config_delegate {
            if let Some(resolver) = delegate_resolver {
                let mut decision = resolver.evaluate_delegate(delegate, user)?;
                decision.config_delegate = Some(delegate.clone());
                decision.explicit_parameters = spec.explicit_parameters.clone();
                let mut merged = exposures;
                merged.append(&mut decision.secondary_exposures);
                decision.secondary_exposures = merged;
                return Ok(decision);
            }
        }

        return Ok(Decision {
            value: rule.return_value.clone(),
            rule_id: rule.id.clone(),
            group_name: rule.group_name.clone(),
            config_delegate: rule.config_delegate.clone(),
            secondary_exposures: exposures,
            explicit_parameters: spec.explicit_parameters.clone(),
            is_experiment_active: spec.is_active,
        });
    }

    Ok(Decision::default_value(spec, DEFAULT_RULE_ID, Vec::new()))
}

fn conditions_match(
    rule: &crate::core::Rule,
    spec: &ConfigSpec,
    user: &StatsigUser,
    condition_ctx: &ConditionContext<'_>,
    depth: u32,
    exposures: &mut Vec<SecondaryExposure>,
) -> Result<bool, EvalError> {
    for condition in &rule.conditions {
        if !evaluate_condition(condition, spec, user, condition_ctx, depth, exposures)? {
            return Ok(false);
        }
    }
    Ok(true)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Condition;
    use crate::core::Rule;
    use crate::core::SpecKind;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn public_rule(id: &str, pass_percentage: f64, return_value: Value) -> Rule {
        Rule {
            id: RuleId::new(id),
            name: String::new(),
            pass_percentage,
            conditions: vec![Condition {
                condition_type: "public".to_string(),
                target_value: None,
                operator: None,
                field: None,
                additional_values: Default::default(),
                id_type: None,
            }],
            return_value,
            salt: None,
            id_type: None,
            group_name: None,
            config_delegate: None,
        }
    }

    fn spec(rules: Vec<Rule>) -> ConfigSpec {
        ConfigSpec {
            name: "nfl_gate".to_string(),
            kind: SpecKind::FeatureGate,
            salt: "na".to_string(),
            enabled: true,
            default_value: json!(false),
            rules,
            id_type: "userID".to_string(),
            entity: None,
            explicit_parameters: BTreeSet::new(),
            is_active: None,
        }
    }

    #[test]
    fn disabled_spec_returns_default_with_sentinel() {
        let mut s = spec(vec![public_rule("r1", 100.0, json!(true))]);
        s.enabled = false;
        let user = StatsigUser::with_user_id("u1");
        let ctx = ConditionContext::default();
        let decision = evaluate_spec(&s, &user, &ctx, None, 0).unwrap();
        assert_eq!(decision.rule_id.as_str(), DISABLED_RULE_ID);
        assert_eq!(decision.value, json!(false));
    }

    #[test]
    fn full_pass_percentage_rule_always_wins() {
        let s = spec(vec![public_rule("gate_pass", 100.0, json!(true))]);
        let user = StatsigUser::with_user_id("u1");
        let ctx = ConditionContext::default();
        let decision = evaluate_spec(&s, &user, &ctx, None, 0).unwrap();
        assert_eq!(decision.rule_id.as_str(), "gate_pass");
        assert_eq!(decision.value, json!(true));
    }

    #[test]
    fn zero_pass_percentage_surfaces_rule_id_but_returns_default() {
        let s = spec(vec![public_rule("gate_fail", 0.0, json!(true))]);
        let user = StatsigUser::with_user_id("u1");
        let ctx = ConditionContext::default();
        let decision = evaluate_spec(&s, &user, &ctx, None, 0).unwrap();
        assert_eq!(decision.rule_id.as_str(), "gate_fail");
        assert_eq!(decision.value, json!(false));
    }

    #[test]
    fn bucketing_failure_does_not_fall_through_to_next_rule() {
        let s = spec(vec![
            public_rule("first", 0.0, json!("first_value")),
            public_rule("second", 100.0, json!("second_value")),
        ]);
        let user = StatsigUser::with_user_id("u1");
        let ctx = ConditionContext::default();
        let decision = evaluate_spec(&s, &user, &ctx, None, 0).unwrap();
        assert_eq!(decision.rule_id.as_str(), "first");
        assert_ne!(decision.value, json!("second_value"));
    }

    #[test]
    fn no_matching_rule_returns_default_sentinel() {
        let s = spec(Vec::new());
        let user = StatsigUser::with_user_id("u1");
        let ctx = ConditionContext::default();
        let decision = evaluate_spec(&s, &user, &ctx, None, 0).unwrap();
        assert_eq!(decision.rule_id.as_str(), DEFAULT_RULE_ID);
    }
}
