//! When to rotate a refresh token's payload.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamgate_core::DomainError;

use super::RefreshTokenRecord;

/// Configured rotation policy for refresh tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTokenUpdatePolicy {
    Never,
    Always,
    QuarterLife,
    #[default]
    HalfLife,
    ThreeQuarterLife,
}

impl RefreshTokenUpdatePolicy {
    /// Elapsed-life fraction that must be strictly exceeded, for the
    /// fraction-based policies.
    fn threshold(self) -> Option<f64> {
        match self {
            RefreshTokenUpdatePolicy::Never | RefreshTokenUpdatePolicy::Always => None,
            RefreshTokenUpdatePolicy::QuarterLife => Some(0.25),
            RefreshTokenUpdatePolicy::HalfLife => Some(0.50),
            RefreshTokenUpdatePolicy::ThreeQuarterLife => Some(0.75),
        }
    }
}

impl FromStr for RefreshTokenUpdatePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            "quarterlife" => Ok(Self::QuarterLife),
            "halflife" => Ok(Self::HalfLife),
            "threequarterlife" => Ok(Self::ThreeQuarterLife),
            _ => Err(DomainError::validation(format!(
                "unknown refresh token update policy '{s}'"
            ))),
        }
    }
}

/// Fraction of the record's lifetime that has elapsed at `now`, in `[0, 1]`.
///
/// A record without a positive lifetime counts as fully elapsed.
pub fn elapsed_fraction(record: &RefreshTokenRecord, now: DateTime<Utc>) -> f64 {
    let lifetime = micros(record.expires_utc - record.created_utc);
    if lifetime <= 0.0 {
        return 1.0;
    }
    let elapsed = micros(now - record.created_utc);
    (elapsed / lifetime).clamp(0.0, 1.0)
}

fn micros(delta: chrono::TimeDelta) -> f64 {
    delta
        .num_microseconds()
        .map(|us| us as f64)
        .unwrap_or_else(|| delta.num_milliseconds() as f64 * 1_000.0)
}

/// Whether `record` should receive a fresh payload under `policy` at `now`.
///
/// Thresholds are strict: a token exactly at the boundary is kept.
pub fn should_rotate(record: &RefreshTokenRecord, policy: RefreshTokenUpdatePolicy, now: DateTime<Utc>) -> bool {
    match policy {
        RefreshTokenUpdatePolicy::Never => false,
        RefreshTokenUpdatePolicy::Always => true,
        fractional => fractional
            .threshold()
            .is_some_and(|threshold| elapsed_fraction(record, now) > threshold),
    }
}
