// statsig-core/src/core/identifiers.rs
// ============================================================================
// Module: Statsig Core Identifiers
// Description: Canonical opaque identifiers for specs, rules, and lists.
// Purpose: Provide strongly typed, serializable names with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! the evaluator and spec store. Identifiers are opaque and serialize as
//! strings; validation (emptiness, uniqueness) is handled at spec-ingestion
//! boundaries rather than within these simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Newtype Macro
// ============================================================================

/// Declares a transparent string newtype with the identifier conveniences
/// shared by every name/key used across the spec store.
macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(
    /// Feature gate name, unique among gates.
    GateName
);
string_newtype!(
    /// Dynamic config name, unique among configs.
    ConfigName
);
string_newtype!(
    /// Layer name, unique among layers.
    LayerName
);
string_newtype!(
    /// Experiment name as referenced by `layers` server mappings.
    ExperimentName
);
string_newtype!(
    /// Rule identifier, unique within a single spec's rule list.
    RuleId
);
string_newtype!(
    /// ID list name as returned by the ID lists lookup endpoint.
    IdListName
);
string_newtype!(
    /// Client SDK key used to resolve an application id.
    ClientSdkKey
);
string_newtype!(
    /// Application identifier mapped from a client SDK key.
    AppId
);
string_newtype!(
    /// Data adapter cache key.
    AdapterKeyName
);

impl AdapterKeyName {
    /// The well-known key under which the ruleset snapshot is saved/loaded.
    #[must_use]
    pub fn rulesets() -> Self {
        Self::new("statsig.cache.rulesets")
    }

    /// The well-known key under which the full ID list index is saved/loaded.
    #[must_use]
    pub fn id_lists() -> Self {
        Self::new("statsig.cache.id_lists")
    }

    /// The per-list key an individual ID list's membership is saved/loaded
    /// under.
    #[must_use]
    pub fn id_list(name: &IdListName) -> Self {
        Self::new(format!("statsig.cache.id_list.{}", name.as_str()))
    }
}
