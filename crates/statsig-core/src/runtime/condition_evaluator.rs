// statsig-core/src/runtime/condition_evaluator.rs
// ============================================================================
// Module: Statsig Runtime Condition Evaluator
// Description: Evaluates a single rule condition against a user context.
// Purpose: Dispatch condition types to the right field resolution + operator.
// Dependencies: crate::core, crate::runtime::operators, time
// ============================================================================

//! ## Overview
//! A condition names a type (`public`, `user_field`, `pass_gate`, ...) and an
//! operator. Evaluation resolves the field value the condition cares about,
//! then applies the operator against `targetValue`. An unrecognized
//! condition type or operator fails closed (`false`), never errors, so a
//! single malformed condition degrades gracefully rather than aborting
//! evaluation of the whole spec.
//!
//! `pass_gate` / `fail_gate` / `multi_pass_gate` / `multi_fail_gate`
//! conditions recurse into another gate's evaluation through a
//! [`GateResolver`]; recursion is depth-guarded to protect against cyclic
//! gate references.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::Condition;
use crate::core::ConfigSpec;
use crate::core::EvalError;
use crate::core::SecondaryExposure;
use crate::core::StatsigUser;
use crate::core::hashing;
use crate::interfaces::IpLocator;
use crate::interfaces::UserAgentParser;
use crate::runtime::operators;
use crate::runtime::operators::NumericOp;
use crate::runtime::operators::VersionOp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum recursion depth for `pass_gate`/`fail_gate` chains, per spec.md
/// §4.3's recommended guard.
pub const MAX_GATE_RECURSION_DEPTH: u32 = 20;

// ============================================================================
// SECTION: Gate Resolver
// ============================================================================

/// Resolves a nested gate reference during condition evaluation. Implemented
/// by the rule evaluator so conditions can recurse without depending on the
/// spec store directly.
pub trait GateResolver {
    /// Evaluates the named gate for `user` and returns its pass/fail outcome
    /// plus the secondary exposures the inner evaluation produced, including
    /// one for the gate itself.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownSpec`] when no such gate exists, or
    /// [`EvalError::RecursionDepthExceeded`] when `depth` exceeds
    /// [`MAX_GATE_RECURSION_DEPTH`].
    fn evaluate_gate(
        &self,
        name: &str,
        user: &StatsigUser,
        depth: u32,
    ) -> Result<(bool, Vec<SecondaryExposure>), EvalError>;
}

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Optional collaborators used to resolve `ip_based`/`ua_based` conditions.
#[derive(Default)]
pub struct ConditionContext<'a> {
    /// Resolver for `pass_gate`/`fail_gate` conditions.
    pub gate_resolver: Option<&'a dyn GateResolver>,
    /// Resolver for `ip_based` conditions lacking a direct `country` field.
    pub ip_locator: Option<&'a dyn IpLocator>,
    /// Resolver for `ua_based` conditions.
    pub ua_parser: Option<&'a dyn UserAgentParser>,
}

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Evaluates a single condition against `user` in the context of `spec`.
/// Nested gate references append their secondary exposures to `exposures`.
///
/// # Errors
///
/// Returns [`EvalError`] only when a nested `pass_gate`/`fail_gate`
/// evaluation fails (unknown gate or recursion depth exceeded); every other
/// unrecognized shape resolves to `Ok(false)`.
pub fn evaluate_condition(
    condition: &Condition,
    spec: &ConfigSpec,
    user: &StatsigUser,
    ctx: &ConditionContext<'_>,
    depth: u32,
    exposures: &mut Vec<SecondaryExposure>,
) -> Result<bool, EvalError> {
    match condition.condition_type.as_str() {
        "public" => Ok(true),
        "fail_gate" => evaluate_single_gate_ref(condition, user, ctx, depth, true, exposures),
        "pass_gate" => evaluate_single_gate_ref(condition, user, ctx, depth, false, exposures),
        "multi_pass_gate" => evaluate_multi_gate_ref(condition, user, ctx, depth, false, exposures),
        "multi_fail_gate" => evaluate_multi_gate_ref(condition, user, ctx, depth, true, exposures),
        "ip_based" => Ok(evaluate_ip_based(condition, user, ctx)),
        "ua_based" => Ok(evaluate_ua_based(condition, user, ctx)),
        "user_field" => Ok(evaluate_field_condition(condition, user.field_value(field_name(condition)))),
        "environment_field" => Ok(evaluate_environment_field(condition, user)),
        "currency_code" => Ok(evaluate_field_condition(condition, user.field_value("country"))),
        "user_bucket" => Ok(evaluate_user_bucket(condition, spec, user)),
        "unit_id" => Ok(evaluate_unit_id(condition, spec, user)),
        _ => Ok(false),
    }
}

fn field_name(condition: &Condition) -> &str {
    condition.field.as_deref().unwrap_or_default()
}

// ============================================================================
// SECTION: Gate References
// ============================================================================

fn evaluate_single_gate_ref(
    condition: &Condition,
    user: &StatsigUser,
    ctx: &ConditionContext<'_>,
    depth: u32,
    negate: bool,
    exposures: &mut Vec<SecondaryExposure>,
) -> Result<bool, EvalError> {
    let Some(resolver) = ctx.gate_resolver else { return Ok(false) };
    let Some(Value::String(gate_name)) = &condition.target_value else { return Ok(false) };
    if depth >= MAX_GATE_RECURSION_DEPTH {
        return Err(EvalError::RecursionDepthExceeded(gate_name.clone()));
    }
    let (result, inner_exposures) = resolver.evaluate_gate(gate_name, user, depth + 1)?;
    exposures.extend(inner_exposures);
    Ok(if negate { !result } else { result })
}

fn evaluate_multi_gate_ref(
    condition: &Condition,
    user: &StatsigUser,
    ctx: &ConditionContext<'_>,
    depth: u32,
    require_all_fail: bool,
    exposures: &mut Vec<SecondaryExposure>,
) -> Result<bool, EvalError> {
    let Some(resolver) = ctx.gate_resolver else { return Ok(false) };
    let Some(Value::Array(names)) = &condition.target_value else { return Ok(false) };
    if depth >= MAX_GATE_RECURSION_DEPTH {
        return Err(EvalError::RecursionDepthExceeded("multi_gate".to_string()));
    }
    for name in names {
        let Value::String(name) = name else { continue };
        let (passed, inner_exposures) = resolver.evaluate_gate(name, user, depth + 1)?;
        exposures.extend(inner_exposures);
        if require_all_fail && passed {
            return Ok(false);
        }
        if !require_all_fail && passed {
            return Ok(true);
        }
    }
    Ok(require_all_fail)
}

// ============================================================================
// SECTION: IP / UA Conditions
// ============================================================================

fn evaluate_ip_based(condition: &Condition, user: &StatsigUser, ctx: &ConditionContext<'_>) -> bool {
    let country = user.country.clone().or_else(|| {
        let ip = user.ip.as_deref()?;
        ctx.ip_locator.and_then(|locator| locator.country_for_ip(ip))
    });
    evaluate_field_condition(condition, country.map(Value::String))
}

fn evaluate_ua_based(condition: &Condition, user: &StatsigUser, ctx: &ConditionContext<'_>) -> bool {
    let Some(ua) = user.user_agent.as_deref() else { return false };
    let field = field_name(condition);
    let resolved = match field.to_ascii_lowercase().as_str() {
        "os_name" | "osname" => ctx.ua_parser.and_then(|parser| parser.os_name(ua)),
        "browser_name" | "browsername" => ctx.ua_parser.and_then(|parser| parser.browser_name(ua)),
        _ => None,
    };
    evaluate_field_condition(condition, resolved.map(Value::String))
}

fn evaluate_environment_field(condition: &Condition, user: &StatsigUser) -> bool {
    let value = user
        .statsig_environment
        .as_ref()
        .and_then(|env| env.get(field_name(condition)))
        .cloned()
        .map(Value::String);
    evaluate_field_condition(condition, value)
}

// ============================================================================
// SECTION: Bucketing Conditions
// ============================================================================

fn evaluate_user_bucket(condition: &Condition, spec: &ConfigSpec, user: &StatsigUser) -> bool {
    let id_type = condition.id_type.as_deref().unwrap_or(&spec.id_type);
    let Some(unit_id) = user.unit_id(id_type) else { return false };
    let key = hashing::user_bucket_key(&spec.salt, unit_id);
    let bucket = hashing::user_bucket_value(&key);
    let Some(Value::Array(buckets)) = &condition.target_value else { return false };
    buckets.iter().filter_map(Value::as_u64).any(|candidate| candidate == bucket)
}

fn evaluate_unit_id(condition: &Condition, spec: &ConfigSpec, user: &StatsigUser) -> bool {
    let id_type = condition.id_type.as_deref().unwrap_or(&spec.id_type);
    let Some(unit_id) = user.unit_id(id_type) else { return false };
    evaluate_field_condition(condition, Some(Value::String(unit_id.to_string())))
}

// ============================================================================
// SECTION: Operator Dispatch
// ============================================================================

/// Applies `condition.operator` to a resolved field value against
/// `condition.target_value`. Missing field value or target value, or an
/// unrecognized operator, resolves to `false`.
fn evaluate_field_condition(condition: &Condition, value: Option<Value>) -> bool {
    let Some(value) = value else { return false };
    let Some(target) = &condition.target_value else { return false };
    let Some(operator) = condition.operator.as_deref() else { return false };

    match operator {
        "eq" => operators::equals(&value, target),
        "neq" => !operators::equals(&value, target),
        "gt" => operators::numeric_compare(NumericOp::GreaterThan, &value, target),
        "gte" => operators::numeric_compare(NumericOp::GreaterOrEqual, &value, target),
        "lt" => operators::numeric_compare(NumericOp::LessThan, &value, target),
        "lte" => operators::numeric_compare(NumericOp::LessOrEqual, &value, target),
        "version_gt" => operators::version_compare(VersionOp::GreaterThan, &value, target),
        "version_gte" => operators::version_compare(VersionOp::GreaterOrEqual, &value, target),
        "version_lt" => operators::version_compare(VersionOp::LessThan, &value, target),
        "version_lte" => operators::version_compare(VersionOp::LessOrEqual, &value, target),
        "version_eq" => operators::version_compare(VersionOp::Equal, &value, target),
        "version_neq" => operators::version_compare(VersionOp::NotEqual, &value, target),
        "str_contains_any" => string_predicate(&value, target, false, operators::str_contains_any),
        "str_contains_none" => string_predicate(&value, target, false, operators::str_contains_none),
        "str_matches" => str_matches(&value, target),
        "str_starts_with_any" => string_predicate(&value, target, true, operators::str_starts_with_any),
        "str_ends_with_any" => string_predicate(&value, target, true, operators::str_ends_with_any),
        "any" => string_predicate(&value, target, false, operators::set_any),
        "none" => string_predicate(&value, target, false, operators::set_none),
        "any_case_sensitive" => string_predicate(&value, target, true, operators::set_any),
        "none_case_sensitive" => string_predicate(&value, target, true, operators::set_none),
        "before" => time_predicate(&value, target, std::cmp::Ordering::Less),
        "after" => time_predicate(&value, target, std::cmp::Ordering::Greater),
        "on" => time_predicate(&value, target, std::cmp::Ordering::Equal),
        _ => false,
    }
}

fn string_predicate(
    value: &Value,
    target: &Value,
    case_sensitive: bool,
    predicate: impl Fn(&str, &[String], bool) -> bool,
) -> bool {
    let Some(value) = value.as_str() else { return false };
    let Some(candidates) = target.as_array() else { return false };
    let candidates: Vec<String> = candidates.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
    predicate(value, &candidates, case_sensitive)
}

fn str_matches(value: &Value, target: &Value) -> bool {
    let (Some(value), Some(pattern)) = (value.as_str(), target.as_str()) else { return false };
    glob_like_match(pattern, value)
}

/// Minimal `*`-wildcard matcher, sufficient for the regex-lite patterns
/// Statsig rule authors write for `str_matches`.
fn glob_like_match(pattern: &str, value: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == value;
    }
    let mut rest = value;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(segment) else { return false };
            rest = stripped;
        } else if i == segments.len() - 1 {
            return rest.ends_with(segment);
        } else if let Some(pos) = rest.find(segment) {
            rest = &rest[pos + segment.len()..];
        } else {
            return false;
        }
    }
    true
}

/// Compares calendar-day granularity epoch-millisecond timestamps.
fn time_predicate(value: &Value, target: &Value, wanted: std::cmp::Ordering) -> bool {
    let (Some(value), Some(target)) = (value.as_i64(), target.as_i64()) else { return false };
    let (Some(value), Some(target)) = (date_from_millis(value), date_from_millis(target)) else {
        return false;
    };
    value.cmp(&target) == wanted
}

/// Converts epoch milliseconds to the UTC calendar date it falls on.
fn date_from_millis(millis: i64) -> Option<time::Date> {
    let seconds = millis.div_euclid(1000);
    time::OffsetDateTime::from_unix_timestamp(seconds).ok().map(time::OffsetDateTime::date)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> ConfigSpec {
        ConfigSpec {
            name: "gate".to_string(),
            kind: crate::core::SpecKind::FeatureGate,
            salt: "salt".to_string(),
            enabled: true,
            default_value: json!(false),
            rules: Vec::new(),
            id_type: "userID".to_string(),
            entity: None,
            explicit_parameters: Default::default(),
            is_active: None,
        }
    }

    fn condition(condition_type: &str) -> Condition {
        Condition {
            condition_type: condition_type.to_string(),
            target_value: None,
            operator: None,
            field: None,
            additional_values: Default::default(),
            id_type: None,
        }
    }

    #[test]
    fn public_condition_always_passes() {
        let ctx = ConditionContext::default();
        let user = StatsigUser::with_user_id("u1");
        let mut exposures = Vec::new();
        assert!(evaluate_condition(&condition("public"), &spec(), &user, &ctx, 0, &mut exposures).unwrap());
    }

    #[test]
    fn user_field_condition_applies_operator() {
        let mut c = condition("user_field");
        c.field = Some("email".to_string());
        c.operator = Some("str_contains_any".to_string());
        c.target_value = Some(json!(["@statsig.com"]));

        let mut user = StatsigUser::with_user_id("u1");
        user.email = Some("dan@statsig.com".to_string());
        let ctx = ConditionContext::default();
        let mut exposures = Vec::new();
        assert!(evaluate_condition(&c, &spec(), &user, &ctx, 0, &mut exposures).unwrap());
    }

    #[test]
    fn unrecognized_condition_type_fails_closed() {
        let ctx = ConditionContext::default();
        let user = StatsigUser::with_user_id("u1");
        let mut exposures = Vec::new();
        assert!(!evaluate_condition(&condition("not_a_real_type"), &spec(), &user, &ctx, 0, &mut exposures).unwrap());
    }

    #[test]
    fn str_matches_supports_wildcards() {
        assert!(glob_like_match("*.statsig.com", "api.statsig.com"));
        assert!(!glob_like_match("*.statsig.com", "api.example.com"));
    }

    #[test]
    fn time_predicate_compares_by_utc_calendar_day() {
        // 2024-01-02T00:30:00Z and 2024-01-02T23:30:00Z fall on the same UTC
        // calendar day despite being nearly 23 hours apart.
        let early = json!(1_704_155_400_000_i64);
        let late = json!(1_704_238_200_000_i64);
        assert!(time_predicate(&early, &late, std::cmp::Ordering::Equal));
        assert!(!time_predicate(&early, &late, std::cmp::Ordering::Less));
    }

    #[test]
    fn user_bucket_condition_checks_membership() {
        let s = spec();
        let user = StatsigUser::with_user_id("u1");
        let key = hashing::user_bucket_key(&s.salt, "u1");
        let bucket = hashing::user_bucket_value(&key);

        let mut c = condition("user_bucket");
        c.target_value = Some(json!([bucket]));
        let ctx = ConditionContext::default();
        let mut exposures = Vec::new();
        assert!(evaluate_condition(&c, &s, &user, &ctx, 0, &mut exposures).unwrap());
    }
}
