//! Obfuscation check over a source sample.

use std::sync::LazyLock;

use regex::Regex;

use crate::indicator::CheckResult;

static BASE64_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9+/]{100,}={0,2}").expect("base64 regex is valid")
});

/// 21 or more consecutive `\xNN` escapes.
static HEX_ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\x[0-9a-fA-F]{2}(?:\\x[0-9a-fA-F]{2}){20,}").expect("hex regex is valid")
});

/// 11 or more consecutive `\uNNNN` escapes.
static UNICODE_ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u[0-9a-fA-F]{4}(?:\\u[0-9a-fA-F]{4}){10,}").expect("unicode regex is valid")
});

static EVAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\beval\s*\(").expect("eval regex is valid"));

static FUNCTION_CTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"new\s+Function\s*\(").expect("Function regex is valid"));

const EVAL_LIMIT: usize = 3;
const FUNCTION_CTOR_LIMIT: usize = 2;

/// Distinct obfuscation signals found in `content`.
pub fn obfuscation_signals(content: &str) -> Vec<String> {
    let mut signals = Vec::new();

    let base64_runs = BASE64_RUN.find_iter(content).count();
    if base64_runs > 0 {
        signals.push(format!("Found {base64_runs} base64-like string(s)"));
    }
    if HEX_ESCAPES.is_match(content) {
        signals.push("Hex-encoded sequences detected".to_string());
    }
    if UNICODE_ESCAPES.is_match(content) {
        signals.push("Unicode escape sequences detected".to_string());
    }

    let evals = EVAL_CALL.find_iter(content).count();
    let ctors = FUNCTION_CTOR.find_iter(content).count();
    if evals > EVAL_LIMIT || ctors > FUNCTION_CTOR_LIMIT {
        signals.push(format!(
            "Suspicious eval/Function usage (eval: {evals}, Function: {ctors})"
        ));
    }

    signals
}

/// Flag encoded payloads and heavy dynamic evaluation.
pub fn check_obfuscated_code(content: &str) -> CheckResult {
    let signals = obfuscation_signals(content);
    if signals.is_empty() {
        return CheckResult::clear();
    }
    let confidence = (0.5 + 0.15 * signals.len() as f64).min(0.9);
    CheckResult::hit(signals.join("; "), confidence)
}
