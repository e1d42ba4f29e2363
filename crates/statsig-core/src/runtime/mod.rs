// statsig-core/src/runtime/mod.rs
// ============================================================================
// Module: Statsig Runtime
// Description: Evaluation engine, spec store orchestration, and supporting
//              scheduling/error-handling primitives.
// Purpose: Re-export the runtime submodules under a single namespace.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The `runtime` module is everything that consumes `core` types and
//! `interfaces` collaborators to do actual evaluation and synchronization:
//! the condition and rule evaluators, the ID list differential sync, the
//! error boundary, the polling primitive, and the spec store that wires them
//! all together.

/// Evaluates a single rule condition against a user context.
pub mod condition_evaluator;
/// Captures and reports unexpected failures.
pub mod error_boundary;
/// Applies differential fetch results to an ID list snapshot.
pub mod id_list_sync;
/// Operator implementations shared by the condition evaluator.
pub mod operators;
/// Periodic-task scheduler with overlap prevention and a liveness watchdog.
pub mod polling;
/// Walks a spec's rules to produce a decision.
pub mod rule_evaluator;
/// Owns the live snapshot and the two steady-state polling loops.
pub mod spec_store;

pub use condition_evaluator::ConditionContext;
pub use condition_evaluator::GateResolver;
pub use condition_evaluator::MAX_GATE_RECURSION_DEPTH;
pub use error_boundary::ErrorBoundary;
pub use error_boundary::SdkMetadata;
pub use id_list_sync::IdListSyncError;
pub use id_list_sync::ListLookupEntry;
pub use id_list_sync::apply_lookup;
pub use polling::PollingLoop;
pub use rule_evaluator::DEFAULT_RULE_ID;
pub use rule_evaluator::DISABLED_RULE_ID;
pub use rule_evaluator::Decision;
pub use rule_evaluator::DelegateResolver;
pub use rule_evaluator::evaluate_spec;
pub use spec_store::InitReason;
pub use spec_store::SpecStore;
pub use spec_store::SpecStoreConfig;
