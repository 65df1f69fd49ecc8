//! # shield-gate
//!
//! Answers "is this release safe to deploy?" from two inputs: whether any
//! incident blocks the exact package version, and which SafeToUse
//! attestations are on offer.
//!
//! Proof validity and issuer trust are separate checks and both are required.
//! A correctly signed attestation from an unknown issuer never unlocks a
//! blocked release.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod evaluator;
pub mod policy;

pub use evaluator::{
    blocking_incidents, AttestationAssessment, GateDecision, GateOutcome, TrustEvaluator,
};
pub use policy::{DefaultPolicy, GatePolicy, PolicySummary};
