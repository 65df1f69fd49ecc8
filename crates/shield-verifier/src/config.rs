use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{VerifierError, VerifierResult};

/// Tunables for the re-check procedure and the attestations it mints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecheckConfig {
    /// Minimum re-derived confidence to confirm a typosquat indicator
    #[serde(default = "default_confirm_threshold")]
    pub confirm_threshold: f64,

    /// Lifetime of the previous-version attestation after a confirmed incident
    #[serde(default = "default_verified_ttl_hours")]
    pub verified_attestation_ttl_hours: i64,

    /// Lifetime of the flagged-version attestation after a false positive
    #[serde(default = "default_false_positive_ttl_hours")]
    pub false_positive_attestation_ttl_hours: i64,
}

impl RecheckConfig {
    pub fn verified_attestation_ttl(&self) -> VerifierResult<Duration> {
        ttl_hours("verified_attestation_ttl_hours", self.verified_attestation_ttl_hours)
    }

    pub fn false_positive_attestation_ttl(&self) -> VerifierResult<Duration> {
        ttl_hours(
            "false_positive_attestation_ttl_hours",
            self.false_positive_attestation_ttl_hours,
        )
    }

    /// Reject thresholds outside [0, 1] and lifetimes that are not a positive
    /// number of hours chrono can represent.
    pub fn validate(&self) -> VerifierResult<()> {
        if !(0.0..=1.0).contains(&self.confirm_threshold) {
            return Err(VerifierError::InvalidConfig(format!(
                "confirm_threshold must be within [0, 1], got {}",
                self.confirm_threshold
            )));
        }
        self.verified_attestation_ttl()?;
        self.false_positive_attestation_ttl()?;
        Ok(())
    }
}

fn ttl_hours(field: &str, hours: i64) -> VerifierResult<Duration> {
    if hours <= 0 {
        return Err(VerifierError::InvalidConfig(format!(
            "{field} must be positive, got {hours}"
        )));
    }
    Duration::try_hours(hours).ok_or_else(|| {
        VerifierError::InvalidConfig(format!("{field} is out of range: {hours}"))
    })
}

impl Default for RecheckConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: default_confirm_threshold(),
            verified_attestation_ttl_hours: default_verified_ttl_hours(),
            false_positive_attestation_ttl_hours: default_false_positive_ttl_hours(),
        }
    }
}

fn default_confirm_threshold() -> f64 {
    0.7
}

fn default_verified_ttl_hours() -> i64 {
    24
}

fn default_false_positive_ttl_hours() -> i64 {
    168
}
