//! Install-script check over a package manifest.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::indicator::CheckResult;

/// Lifecycle hooks that run on the installing machine.
pub const LIFECYCLE_SCRIPTS: &[&str] = &["postinstall", "preinstall", "install", "prepublish"];

/// Scripts longer than this with no dangerous pattern are still reported.
pub const LONG_SCRIPT_CHARS: usize = 200;

const EXCERPT_CHARS: usize = 100;

static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)curl\s+",
        r"(?i)wget\s+",
        r"(?i)eval\s*\(",
        r"(?i)base64",
        r"(?i)\.sh\s*$",
        r"(?i)node\s+-e",
        r"(?i)python\s+-c",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("script pattern is valid"))
    .collect()
});

/// The manifest's `scripts` object, or `None` if absent or not an object.
pub fn scripts_of(manifest: &Value) -> Option<&serde_json::Map<String, Value>> {
    manifest.get("scripts").and_then(Value::as_object)
}

/// Per-script findings, one entry per flagged lifecycle hook.
pub fn script_findings(manifest: &Value) -> Vec<String> {
    let Some(scripts) = scripts_of(manifest) else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for hook in LIFECYCLE_SCRIPTS {
        let Some(body) = scripts.get(*hook).and_then(Value::as_str) else {
            continue;
        };
        if DANGEROUS_PATTERNS.iter().any(|re| re.is_match(body)) {
            let excerpt: String = body.chars().take(EXCERPT_CHARS).collect();
            findings.push(format!("{hook}: {excerpt}"));
        } else {
            let len = body.chars().count();
            if len > LONG_SCRIPT_CHARS {
                findings.push(format!("{hook}: long script ({len} chars)"));
            }
        }
    }
    findings
}

/// Flag lifecycle scripts that download, evaluate, or hide code.
pub fn check_suspicious_scripts(manifest: &Value) -> CheckResult {
    let findings = script_findings(manifest);
    if findings.is_empty() {
        return CheckResult::clear();
    }
    let confidence = (0.6 + 0.15 * findings.len() as f64).min(0.95);
    CheckResult::hit(
        format!("Suspicious install scripts: {}", findings.join(", ")),
        confidence,
    )
}
