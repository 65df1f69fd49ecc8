use std::fmt;

use serde::{Deserialize, Serialize};
use shield_detection::{IndicatorKind, RiskIndicator};

/// Incident severity, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Derive severity from the indicator kinds present and the overall confidence.
    ///
    /// | condition | severity |
    /// |---|---|
    /// | confidence >= 0.85 and typosquat or scripts present | Critical |
    /// | confidence >= 0.70 or scripts present | High |
    /// | confidence >= 0.50 or obfuscation present | Medium |
    /// | otherwise | Low |
    pub fn classify(indicators: &[RiskIndicator], confidence: f64) -> Self {
        let has = |kind: IndicatorKind| indicators.iter().any(|ind| ind.kind == kind);
        let typosquat = has(IndicatorKind::Typosquat);
        let scripts = has(IndicatorKind::SuspiciousScripts);
        let obfuscation = has(IndicatorKind::ObfuscatedCode);

        if confidence >= 0.85 && (typosquat || scripts) {
            Severity::Critical
        } else if confidence >= 0.7 || scripts {
            Severity::High
        } else if confidence >= 0.5 || obfuscation {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
