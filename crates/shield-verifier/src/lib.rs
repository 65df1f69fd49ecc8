//! # shield-verifier
//!
//! Independent adjudication of a scanner's finding. The verifier validates the
//! finding credential, re-derives a verdict from the incident's indicators,
//! and mints a VerifiedIncident or FalsePositive credential plus a SafeToUse
//! attestation.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod recheck;
pub mod verifier;

pub use config::RecheckConfig;
pub use error::{VerifierError, VerifierResult};
pub use recheck::{recheck, RecheckVerdict};
pub use verifier::{VerificationOutcome, Verifier};
