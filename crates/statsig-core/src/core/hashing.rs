// statsig-core/src/core/hashing.rs
// ============================================================================
// Module: Statsig Core Bucketing Hasher
// Description: Deterministic SHA-256-based bucketing to a 64-bit space.
// Purpose: Provide the single canonical hash function all rule and user
//          bucket decisions are built from, so bucketing matches other SDKs.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Every bucketing decision in the evaluator reduces to one function:
//! `compute_user_hash`, the first eight bytes of `SHA-256(input)` read as a
//! big-endian unsigned 64-bit integer. All downstream math (pass/fail,
//! `user_bucket`, variant selection) is unsigned 64-bit integer arithmetic;
//! no floating point is used anywhere in this module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Modulus used for pass/fail percentage bucketing.
pub const PASS_PERCENTAGE_MODULUS: u64 = 10_000;
/// Modulus used for `user_bucket` condition evaluation.
pub const USER_BUCKET_MODULUS: u64 = 1_000;

// ============================================================================
// SECTION: Core Hash Function
// ============================================================================

/// Computes the canonical bucketing hash of a string.
///
/// `h(s) = first 8 bytes of SHA-256(s), interpreted big-endian as u64`.
#[must_use]
pub fn compute_user_hash(input: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

// ============================================================================
// SECTION: Bucketing Helpers
// ============================================================================

/// Builds the bucketing key for pass/fail percentage checks:
/// `spec.salt + "." + rule_salt_or_id + "." + unit_id`.
#[must_use]
pub fn pass_percentage_key(spec_salt: &str, rule_salt_or_id: &str, unit_id: &str) -> String {
    format!("{spec_salt}.{rule_salt_or_id}.{unit_id}")
}

/// Builds the bucketing key for `user_bucket` conditions: `spec.salt + "." + unit_id`.
#[must_use]
pub fn user_bucket_key(spec_salt: &str, unit_id: &str) -> String {
    format!("{spec_salt}.{unit_id}")
}

/// Evaluates whether a rule with the given `passPercentage` (0-100, may carry
/// up to two decimal places of precision in the caller's integer scale)
/// passes for the given bucketing key.
///
/// `passPercentage` is multiplied by 100 before comparison against
/// `hash mod 10_000`, keeping the comparison integer-only.
#[must_use]
pub fn evaluate_pass_percentage(key: &str, pass_percentage: f64) -> bool {
    let hash = compute_user_hash(key);
    let bucket = hash % PASS_PERCENTAGE_MODULUS;
    let threshold = scaled_percentage(pass_percentage);
    u64::from(bucket) < threshold
}

/// Computes the `user_bucket` value (`0..1000`) for a bucketing key.
#[must_use]
pub fn user_bucket_value(key: &str) -> u64 {
    compute_user_hash(key) % USER_BUCKET_MODULUS
}

/// Scales a percentage in `[0, 100]` to the `[0, 10_000]` integer space used
/// for comparison against `hash mod 10_000`. Out-of-range values are clamped
/// to fail closed on the low side and saturate on the high side.
fn scaled_percentage(pass_percentage: f64) -> u64 {
    if !pass_percentage.is_finite() || pass_percentage <= 0.0 {
        return 0;
    }
    if pass_percentage >= 100.0 {
        return PASS_PERCENTAGE_MODULUS;
    }
    // Integer math only past this point: percentage is already validated finite.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "pass_percentage is clamped to [0, 100) above, so *100 fits in u64"
    )]
    let scaled = (pass_percentage * 100.0).round() as u64;
    scaled.min(PASS_PERCENTAGE_MODULUS)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_user_hash_is_deterministic() {
        let a = compute_user_hash("na.rule_id_gate.tore@packers.com");
        let b = compute_user_hash("na.rule_id_gate.tore@packers.com");
        assert_eq!(a, b);
    }

    #[test]
    fn compute_user_hash_differs_for_different_inputs() {
        assert_ne!(compute_user_hash("a"), compute_user_hash("b"));
    }

    #[test]
    fn scaled_percentage_clamps_bounds() {
        assert_eq!(scaled_percentage(-5.0), 0);
        assert_eq!(scaled_percentage(0.0), 0);
        assert_eq!(scaled_percentage(100.0), PASS_PERCENTAGE_MODULUS);
        assert_eq!(scaled_percentage(150.0), PASS_PERCENTAGE_MODULUS);
        assert_eq!(scaled_percentage(50.0), 5_000);
    }

    #[test]
    fn evaluate_pass_percentage_at_zero_never_passes() {
        for i in 0..200 {
            let key = pass_percentage_key("salt", "rule", &format!("user-{i}"));
            assert!(!evaluate_pass_percentage(&key, 0.0));
        }
    }

    #[test]
    fn evaluate_pass_percentage_at_hundred_always_passes() {
        for i in 0..200 {
            let key = pass_percentage_key("salt", "rule", &format!("user-{i}"));
            assert!(evaluate_pass_percentage(&key, 100.0));
        }
    }

    #[test]
    fn user_bucket_value_is_within_modulus() {
        for i in 0..200 {
            let key = user_bucket_key("salt", &format!("user-{i}"));
            assert!(user_bucket_value(&key) < USER_BUCKET_MODULUS);
        }
    }

    #[test]
    fn bucketing_distribution_approaches_pass_percentage() {
        let mut passes = 0u32;
        for i in 0..1000 {
            let key = pass_percentage_key("na", "rule_id_gate", &format!("user-{i}"));
            if evaluate_pass_percentage(&key, 50.0) {
                passes += 1;
            }
        }
        assert!((400..=600).contains(&passes), "pass count {passes} outside expected band");
    }
}
