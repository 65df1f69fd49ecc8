//! # shield-agents
//!
//! The three agents of a Swarm Shield deployment, wired to storage and
//! transport:
//!
//! - [`ScannerAgent`] analyzes release events, opens incidents and mints risk
//!   findings, then asks verifiers to look.
//! - [`VerifierAgent`] checks the finding, re-derives the verdict and drives
//!   the incident to `Verified` or `FalsePositive`.
//! - [`CiAgent`] answers whether a project may take a package version.
//!
//! [`Swarm`] assembles all three on one [`shield_transport::InMemoryBus`] from
//! a [`ShieldConfig`].

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod ci;
pub mod config;
pub mod error;
pub mod event;
mod notify;
pub mod remediation;
pub mod scanner;
pub mod swarm;
pub mod verifier;

pub use ci::{CheckResponse, CiAgent, CAP_RELEASE_GATEKEEPING};
pub use config::{
    AgentIdentities, IssuerKeyConfig, ProofKeys, ShieldConfig, SigningConfig, SigningScheme,
};
pub use error::{AgentError, AgentResult};
pub use event::{ReleaseEvent, VerificationRequest, VerificationResult};
pub use remediation::record_remediation;
pub use scanner::{ScanReport, ScannerAgent, CAP_DEPENDENCY_ANALYSIS};
pub use swarm::{FlowReport, Swarm};
pub use verifier::{VerifierAgent, CAP_INCIDENT_RESPONSE};
