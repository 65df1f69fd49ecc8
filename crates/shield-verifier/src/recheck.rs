use serde::{Deserialize, Serialize};
use shield_detection::{check_typosquat, DetectionConfig, IndicatorKind, RiskIndicator};

use crate::config::RecheckConfig;

/// Independent verdict over a finding's indicators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecheckVerdict {
    pub verified: bool,
    pub confirmed: Vec<IndicatorKind>,
    pub notes: String,
}

/// Re-derive a verdict instead of trusting the scanner's confidence.
///
/// Typosquat indicators are confirmed only if the name check, re-run here,
/// still triggers with confidence at or above `confirm_threshold`. Script and
/// obfuscation indicators are confirmed by their presence.
pub fn recheck(
    indicators: &[RiskIndicator],
    package_name: &str,
    detection: &DetectionConfig,
    config: &RecheckConfig,
) -> RecheckVerdict {
    let mut confirmed = Vec::new();
    let mut notes = Vec::new();

    for indicator in indicators {
        match indicator.kind {
            IndicatorKind::Typosquat => {
                let rerun = check_typosquat(package_name, detection);
                if rerun.triggered && rerun.confidence >= config.confirm_threshold {
                    confirmed.push(IndicatorKind::Typosquat);
                    notes.push(format!("Confirmed typosquat: {}", rerun.description));
                }
            }
            IndicatorKind::SuspiciousScripts => {
                confirmed.push(IndicatorKind::SuspiciousScripts);
                notes.push("Confirmed suspicious install scripts".to_string());
            }
            IndicatorKind::ObfuscatedCode => {
                confirmed.push(IndicatorKind::ObfuscatedCode);
                notes.push("Confirmed obfuscated code patterns".to_string());
            }
        }
    }

    let notes = if notes.is_empty() {
        "No indicators confirmed".to_string()
    } else {
        notes.join("; ")
    };
    RecheckVerdict {
        verified: !confirmed.is_empty(),
        confirmed,
        notes,
    }
}
