use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of evidence a check produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Name imitates a well-known package
    Typosquat,
    /// Lifecycle script fetches, evaluates, or hides code
    SuspiciousScripts,
    /// Encoded or dynamically evaluated payloads in the source sample
    ObfuscatedCode,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Typosquat => "typosquat",
            IndicatorKind::SuspiciousScripts => "suspicious_scripts",
            IndicatorKind::ObfuscatedCode => "obfuscated_code",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of detection evidence.
///
/// Immutable once attached to an incident. `evidence_digest` is the SHA-256
/// of the raw evidence so later parties can confirm it without the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskIndicator {
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub description: String,
    /// Confidence in [0.0, 1.0]
    pub confidence: f64,
    #[serde(rename = "evidence", alias = "evidence_digest")]
    pub evidence_digest: String,
}

impl RiskIndicator {
    pub fn new(
        kind: IndicatorKind,
        description: impl Into<String>,
        confidence: f64,
        evidence: &str,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            evidence_digest: evidence_digest(evidence),
        }
    }
}

/// Result of a single check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    pub triggered: bool,
    pub description: String,
    pub confidence: f64,
}

impl CheckResult {
    pub fn clear() -> Self {
        Self {
            triggered: false,
            description: String::new(),
            confidence: 0.0,
        }
    }

    pub fn hit(description: impl Into<String>, confidence: f64) -> Self {
        Self {
            triggered: true,
            description: description.into(),
            confidence,
        }
    }
}

/// Lowercase hex SHA-256 of `evidence`.
pub fn evidence_digest(evidence: &str) -> String {
    hex::encode(Sha256::digest(evidence.as_bytes()))
}
