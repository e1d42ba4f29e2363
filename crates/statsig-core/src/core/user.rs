// statsig-core/src/core/user.rs
// ============================================================================
// Module: Statsig Core User Context
// Description: Evaluation-time user context and case-insensitive field lookup.
// Purpose: Provide the single input shape condition evaluation reads from.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `StatsigUser` is the evaluation-time context passed to the rule and
//! condition evaluators. Field lookup on the well-known top-level fields and
//! on the `custom` map is case-insensitive; `privateAttributes` takes
//! precedence over `custom` when both carry a key

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: User Context
// ============================================================================

/// Evaluation-time user context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsigUser {
    /// Primary user identifier, the default unit of randomization.
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// IP address, used directly or as a fallback source for `ip_based` conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// User agent string, used directly or as a fallback source for `ua_based` conditions.
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Locale string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Application version.
    #[serde(rename = "appVersion", default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Arbitrary custom fields.
    #[serde(default)]
    pub custom: BTreeMap<String, Value>,
    /// Private attributes, never logged, takes precedence over `custom`.
    #[serde(rename = "privateAttributes", default)]
    pub private_attributes: BTreeMap<String, Value>,
    /// Alternate unit ids keyed by `idType`.
    #[serde(rename = "customIDs", default)]
    pub custom_ids: BTreeMap<String, String>,
    /// Statsig environment tier override carried on the user object.
    #[serde(rename = "statsigEnvironment", default, skip_serializing_if = "Option::is_none")]
    pub statsig_environment: Option<BTreeMap<String, String>>,
}

impl StatsigUser {
    /// Creates a user context with only a `userID` set.
    #[must_use]
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Resolves the unit id used for bucketing, given an `idType`.
    ///
    /// Defaults to `userID` when `id_type` is `"userID"`, empty, or absent
    /// from `customIDs`. Returns `None` when no id can be resolved, in which
    /// case callers should treat bucketing as a non-match.
    #[must_use]
    pub fn unit_id(&self, id_type: &str) -> Option<&str> {
        if id_type.is_empty() || id_type.eq_ignore_ascii_case("userid") {
            return self.user_id.as_deref();
        }
        self.custom_ids
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(id_type))
            .map(|(_, value)| value.as_str())
            .or(self.user_id.as_deref())
    }

    /// Looks up a well-known top-level field by case-insensitive name.
    #[must_use]
    pub fn top_level_field(&self, field: &str) -> Option<String> {
        match field.to_ascii_lowercase().as_str() {
            "userid" => self.user_id.clone(),
            "email" => self.email.clone(),
            "ip" => self.ip.clone(),
            "useragent" => self.user_agent.clone(),
            "country" => self.country.clone(),
            "locale" => self.locale.clone(),
            "appversion" => self.app_version.clone(),
            _ => None,
        }
    }

    /// Looks up a field by case-insensitive name, checking `privateAttributes`
    /// first, then `custom`, then the well-known top-level fields.
    #[must_use]
    pub fn field_value(&self, field: &str) -> Option<Value> {
        if let Some(value) = case_insensitive_lookup(&self.private_attributes, field) {
            return Some(value.clone());
        }
        if let Some(value) = case_insensitive_lookup(&self.custom, field) {
            return Some(value.clone());
        }
        self.top_level_field(field).map(Value::String)
    }
}

/// Performs a case-insensitive key lookup against a string-keyed map.
fn case_insensitive_lookup<'a>(map: &'a BTreeMap<String, Value>, field: &str) -> Option<&'a Value> {
    map.iter().find(|(key, _)| key.eq_ignore_ascii_case(field)).map(|(_, value)| value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn private_attributes_take_precedence_over_custom() {
        let mut user = StatsigUser::with_user_id("u1");
        user.custom.insert("level".to_string(), json!(5));
        user.private_attributes.insert("level".to_string(), json!(10));
        assert_eq!(user.field_value("level"), Some(json!(10)));
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let mut user = StatsigUser::with_user_id("u1");
        user.custom.insert("Level".to_string(), json!(9));
        assert_eq!(user.field_value("level"), Some(json!(9)));
    }

    #[test]
    fn unit_id_defaults_to_user_id() {
        let user = StatsigUser::with_user_id("u1");
        assert_eq!(user.unit_id("userID"), Some("u1"));
        assert_eq!(user.unit_id(""), Some("u1"));
    }

    #[test]
    fn unit_id_resolves_custom_id_type() {
        let mut user = StatsigUser::with_user_id("u1");
        user.custom_ids.insert("companyID".to_string(), "acme".to_string());
        assert_eq!(user.unit_id("companyID"), Some("acme"));
    }
}
