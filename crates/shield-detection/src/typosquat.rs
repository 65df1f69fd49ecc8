//! Name-similarity check against the reference package list.

use tracing::debug;

use crate::config::DetectionConfig;
use crate::indicator::CheckResult;

/// Edit distance between `a` and `b`, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / max_len`, in [0.0, 1.0]. Two empty names are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn decorations(reference: &str) -> [String; 7] {
    [
        format!("{reference}-"),
        format!("-{reference}"),
        format!("{reference}s"),
        format!("{reference}js"),
        format!("node-{reference}"),
        format!("{reference}-node"),
        format!("{reference}lib"),
    ]
}

/// Flag `package_name` when it imitates a reference name.
///
/// References are tried in order; for each, edit-distance similarity is
/// checked first and the decoration patterns second. A name equal to any
/// reference never triggers.
pub fn check_typosquat(package_name: &str, config: &DetectionConfig) -> CheckResult {
    let name = package_name.to_lowercase();
    if name.is_empty() {
        return CheckResult::clear();
    }

    let references: Vec<String> = config
        .reference_packages
        .iter()
        .map(|r| r.to_lowercase())
        .collect();
    if references.iter().any(|r| *r == name) {
        return CheckResult::clear();
    }

    for reference in &references {
        let score = similarity(&name, reference);
        if score >= config.similarity_threshold {
            debug!(package = %package_name, reference = %reference, score, "Name similarity hit");
            return CheckResult::hit(
                format!(
                    "Similar to '{reference}' (similarity: {:.2}%)",
                    score * 100.0
                ),
                score,
            );
        }

        let decorated = decorations(reference)
            .iter()
            .any(|pattern| name.contains(pattern.as_str()) || pattern.contains(name.as_str()));
        if decorated {
            debug!(package = %package_name, reference = %reference, "Decorated name hit");
            return CheckResult::hit(
                format!("Pattern match with '{reference}' variant"),
                config.pattern_confidence,
            );
        }
    }

    CheckResult::clear()
}
