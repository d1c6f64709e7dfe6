#![forbid(unsafe_code)]

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Accepted values of `obligation_id_len`: at least one digit, at most a
/// whole SHA-256 digest.
pub const OBLIGATION_ID_LEN: RangeInclusive<usize> = 1..=64;

/// Knobs for obligation generation. Every field has a default, so a partial
/// `[verify]` table is enough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyOptions {
    /// Drop an obligation whose id was already emitted.
    pub dedupe_obligations: bool,
    /// Hex digits kept from the SHA-256 of an obligation.
    pub obligation_id_len: usize,
    /// Prefix for the constant that snapshots a bound before a loop body.
    pub bound_prefix: String,
    /// Prefix for cell-value variables introduced by heap rules.
    pub heap_prefix: String,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            dedupe_obligations: true,
            obligation_id_len: 16,
            bound_prefix: "bnd".to_string(),
            heap_prefix: "v".to_string(),
        }
    }
}

impl VerifyOptions {
    /// Rejects options that would make obligation ids meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !OBLIGATION_ID_LEN.contains(&self.obligation_id_len) {
            return Err(format!(
                "obligation_id_len must be between {} and {}, got {}",
                OBLIGATION_ID_LEN.start(),
                OBLIGATION_ID_LEN.end(),
                self.obligation_id_len
            ));
        }
        Ok(())
    }
}
