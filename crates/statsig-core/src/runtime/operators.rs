// statsig-core/src/runtime/operators.rs
// ============================================================================
// Module: Statsig Runtime Operators
// Description: Value comparison operators shared by condition evaluation.
// Purpose: Convert a field value and target value into a boolean outcome.
// Dependencies: serde_json, bigdecimal
// ============================================================================

//! ## Overview
//! Operators compare a resolved field value against a condition's
//! `targetValue`. An operator applied to values it cannot interpret (wrong
//! JSON shape, non-numeric string where a number is required) returns
//! `false` rather than erroring, matching the documented fail-closed
//! evaluation stance: an unrecognized comparison never grants access.
//! Numeric comparisons go through `BigDecimal` rather than `f64` so large or
//! high-precision values (e.g. `9007199254740993`) compare exactly instead
//! of rounding through a lossy float conversion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;

// ============================================================================
// SECTION: Equality
// ============================================================================

/// `eq` / `neq` on the JSON value after a best-effort string/number coercion.
#[must_use]
pub fn equals(value: &Value, target: &Value) -> bool {
    if value == target {
        return true;
    }
    as_comparable_string(value) == as_comparable_string(target)
}

// ============================================================================
// SECTION: Numeric Comparison
// ============================================================================

/// Numeric ordering operators: `gt`, `gte`, `lt`, `lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    /// Greater than.
    GreaterThan,
    /// Greater than or equal to.
    GreaterOrEqual,
    /// Less than.
    LessThan,
    /// Less than or equal to.
    LessOrEqual,
}

/// Evaluates a numeric comparison, coercing strings to an exact decimal
/// where possible. Returns `false` when either side cannot be interpreted
/// as a number.
#[must_use]
pub fn numeric_compare(op: NumericOp, value: &Value, target: &Value) -> bool {
    let Some(ordering) = decimal_cmp(value, target) else { return false };
    match op {
        NumericOp::GreaterThan => ordering.is_gt(),
        NumericOp::GreaterOrEqual => ordering.is_ge(),
        NumericOp::LessThan => ordering.is_lt(),
        NumericOp::LessOrEqual => ordering.is_le(),
    }
}

fn decimal_cmp(value: &Value, target: &Value) -> Option<std::cmp::Ordering> {
    let value = as_decimal(value)?;
    let target = as_decimal(target)?;
    Some(value.cmp(&target))
}

// ============================================================================
// SECTION: Version Comparison
// ============================================================================

/// Version ordering operators: `version_gt`, `version_gte`, `version_lt`,
/// `version_lte`, `version_eq`, `version_neq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    /// Strictly greater.
    GreaterThan,
    /// Greater than or equal.
    GreaterOrEqual,
    /// Strictly less.
    LessThan,
    /// Less than or equal.
    LessOrEqual,
    /// Equal.
    Equal,
    /// Not equal.
    NotEqual,
}

/// Compares two dotted numeric version strings (`"1.2.3"`), ignoring any
/// build-metadata/prerelease suffix after a `-` or `+`. Missing trailing
/// components are treated as `0`. Returns `false` if either side cannot be
/// parsed as a dotted numeric version.
#[must_use]
pub fn version_compare(op: VersionOp, value: &Value, target: &Value) -> bool {
    let (Some(value), Some(target)) = (as_comparable_string(value), as_comparable_string(target))
    else {
        return false;
    };
    let (Some(left), Some(right)) = (parse_version(&value), parse_version(&target)) else {
        return false;
    };
    let len = left.len().max(right.len());
    let pad = |v: Vec<u64>| {
        let mut v = v;
        v.resize(len, 0);
        v
    };
    let ordering = pad(left).cmp(&pad(right));
    match op {
        VersionOp::GreaterThan => ordering.is_gt(),
        VersionOp::GreaterOrEqual => ordering.is_ge(),
        VersionOp::LessThan => ordering.is_lt(),
        VersionOp::LessOrEqual => ordering.is_le(),
        VersionOp::Equal => ordering.is_eq(),
        VersionOp::NotEqual => !ordering.is_eq(),
    }
}

/// Parses a dotted numeric version, dropping any `-`/`+` suffix.
fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let core = raw.split(['-', '+']).next().unwrap_or(raw);
    if core.is_empty() {
        return None;
    }
    core.split('.').map(str::parse::<u64>).collect::<Result<Vec<_>, _>>().ok()
}

// ============================================================================
// SECTION: String Predicates
// ============================================================================

/// `str_contains_any`: whether `value` contains any of `candidates`.
#[must_use]
pub fn str_contains_any(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    candidates.iter().any(|candidate| contains(value, candidate, case_sensitive))
}

/// `str_contains_none`: negation of [`str_contains_any`].
#[must_use]
pub fn str_contains_none(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    !str_contains_any(value, candidates, case_sensitive)
}

fn contains(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// `str_starts_with_any` / `str_ends_with_any`.
#[must_use]
pub fn str_starts_with_any(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    candidates.iter().any(|candidate| {
        if case_sensitive {
            value.starts_with(candidate.as_str())
        } else {
            value.to_lowercase().starts_with(&candidate.to_lowercase())
        }
    })
}

/// See [`str_starts_with_any`].
#[must_use]
pub fn str_ends_with_any(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    candidates.iter().any(|candidate| {
        if case_sensitive {
            value.ends_with(candidate.as_str())
        } else {
            value.to_lowercase().ends_with(&candidate.to_lowercase())
        }
    })
}

// ============================================================================
// SECTION: Set Membership
// ============================================================================

/// `any` / `none`: membership of `value` in `candidates`, case-insensitive by
/// default, or `any_case_sensitive` / `none_case_sensitive` when exact.
#[must_use]
pub fn set_any(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    candidates.iter().any(|candidate| {
        if case_sensitive {
            candidate == value
        } else {
            candidate.eq_ignore_ascii_case(value)
        }
    })
}

/// See [`set_any`].
#[must_use]
pub fn set_none(value: &str, candidates: &[String], case_sensitive: bool) -> bool {
    !set_any(value, candidates, case_sensitive)
}

// ============================================================================
// SECTION: Coercion Helpers
// ============================================================================

/// Renders a JSON value as a string for string-oriented comparisons, leaving
/// objects/arrays/null unrepresentable (returns `None`).
fn as_comparable_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerces a JSON value to an exact [`BigDecimal`], accepting numeric strings.
fn as_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equals_coerces_number_and_string() {
        assert!(equals(&json!(5), &json!("5")));
        assert!(!equals(&json!(5), &json!("6")));
    }

    #[test]
    fn numeric_compare_handles_string_numbers() {
        assert!(numeric_compare(NumericOp::GreaterThan, &json!("10"), &json!(5)));
        assert!(!numeric_compare(NumericOp::GreaterThan, &json!("abc"), &json!(5)));
    }

    #[test]
    fn numeric_compare_is_exact_past_f64_precision() {
        // 9007199254740993 is the smallest positive integer an f64 cannot
        // represent exactly; it would round down to 9007199254740992.
        assert!(numeric_compare(
            NumericOp::GreaterThan,
            &json!("9007199254740993"),
            &json!("9007199254740992")
        ));
        assert!(!numeric_compare(
            NumericOp::GreaterThan,
            &json!("9007199254740992"),
            &json!("9007199254740992")
        ));
    }

    #[test]
    fn version_compare_ignores_prerelease_suffix() {
        assert!(version_compare(VersionOp::Equal, &json!("1.2.0-beta"), &json!("1.2.0")));
        assert!(version_compare(VersionOp::GreaterThan, &json!("1.10.0"), &json!("1.9.0")));
    }

    #[test]
    fn version_compare_pads_missing_components() {
        assert!(version_compare(VersionOp::Equal, &json!("1.2"), &json!("1.2.0")));
    }

    #[test]
    fn str_contains_any_is_case_insensitive_by_default() {
        assert!(str_contains_any("Hello World", &["world".to_string()], false));
        assert!(!str_contains_any("Hello World", &["world".to_string()], true));
    }

    #[test]
    fn set_membership_respects_case_sensitivity() {
        let candidates = vec!["US".to_string(), "CA".to_string()];
        assert!(set_any("us", &candidates, false));
        assert!(!set_any("us", &candidates, true));
    }
}
