//! # shield-incident
//!
//! The incident record and the state machine credentials drive it through.
//!
//! ```text
//! Detected ──VerifiedIncident──▶ Verified ──remediation──▶ Mitigated
//!     └──────FalsePositive─────▶ FalsePositive
//! ```
//!
//! Severity is derived once when the incident is opened and never revised.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod incident;
pub mod lifecycle;
pub mod severity;

pub use error::{LifecycleError, LifecycleResult};
pub use incident::{Incident, IncidentStatus};
pub use lifecycle::{IncidentLifecycle, IncidentUpdate};
pub use severity::Severity;
