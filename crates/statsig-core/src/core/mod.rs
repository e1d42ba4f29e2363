// statsig-core/src/core/mod.rs
// ============================================================================
// Module: Statsig Core Data Types
// Description: Pure data model shared by the evaluator, store, and runtime.
// Purpose: Re-export the core submodules under a single namespace.
// Dependencies: none (submodules only)
// ============================================================================

//! ## Overview
//! The `core` module holds every type that has no collaborators: identifiers,
//! the bucketing hash, timestamps, the user context, the spec/rule/condition
//! model, ID lists, and the shared error taxonomy. Nothing here performs I/O.

/// Owned mapping of gates/configs/layers built from one successful sync.
pub mod config_store;
/// Error taxonomy shared by the error boundary.
pub mod errors;
/// Secondary exposure records from nested gate evaluation.
pub mod exposure;
/// Deterministic SHA-256 bucketing hash.
pub mod hashing;
/// Canonical opaque identifiers.
pub mod identifiers;
/// ID list membership and diff application.
pub mod id_list;
/// Gate/config/layer specification model.
pub mod spec;
/// Millisecond epoch timestamps.
pub mod time;
/// Evaluation-time user context.
pub mod user;

pub use config_store::ConfigStore;
pub use config_store::ConfigStoreBuildError;
pub use config_store::SamplingRates;
pub use errors::ClassifiedError;
pub use errors::EvalError;
pub use errors::StatsigErrorKind;
pub use errors::StoreError;
pub use exposure::SecondaryExposure;
pub use hashing::compute_user_hash;
pub use hashing::evaluate_pass_percentage;
pub use hashing::pass_percentage_key;
pub use hashing::user_bucket_key;
pub use hashing::user_bucket_value;
pub use identifiers::AdapterKeyName;
pub use identifiers::AppId;
pub use identifiers::ClientSdkKey;
pub use identifiers::ConfigName;
pub use identifiers::ExperimentName;
pub use identifiers::GateName;
pub use identifiers::IdListName;
pub use identifiers::LayerName;
pub use identifiers::RuleId;
pub use id_list::IdList;
pub use id_list::IdListIndex;
pub use id_list::IdListIndexEntry;
pub use id_list::IdListSnapshot;
pub use spec::Condition;
pub use spec::ConfigSpec;
pub use spec::Rule;
pub use spec::SpecError;
pub use spec::SpecKind;
pub use time::Timestamp;
pub use user::StatsigUser;
