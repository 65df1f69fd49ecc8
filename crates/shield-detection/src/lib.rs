//! # shield-detection
//!
//! Heuristic checks over a package release. Each check is a pure function
//! returning a [`CheckResult`]; [`DetectionEngine::analyze`] turns the triggered
//! ones into [`RiskIndicator`]s and takes the maximum confidence.
//!
//! - [`check_typosquat`]: name similarity against a reference list
//! - [`check_suspicious_scripts`]: lifecycle hooks in the manifest
//! - [`check_obfuscated_code`]: encoded payloads in a source sample

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod engine;
pub mod indicator;
pub mod obfuscation;
pub mod scripts;
pub mod typosquat;

pub use config::{DetectionConfig, DEFAULT_REFERENCE_PACKAGES};
pub use engine::{overall_confidence, Analysis, DetectionEngine};
pub use indicator::{evidence_digest, CheckResult, IndicatorKind, RiskIndicator};
pub use obfuscation::{check_obfuscated_code, obfuscation_signals};
pub use scripts::{check_suspicious_scripts, script_findings, LIFECYCLE_SCRIPTS};
pub use typosquat::{check_typosquat, levenshtein, similarity};
