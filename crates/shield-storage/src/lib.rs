//! Swarm Shield storage contracts.
//!
//! Incidents, credentials and remediation actions live behind async traits.
//! [`ShieldStorage`] bundles them for the agents; [`memory::InMemoryShieldStorage`]
//! is the reference adapter.
//!
//! Incident status only changes through [`IncidentStore::apply_update`], which
//! compares the stored status against the one the update was planned from.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryShieldStorage;
pub use model::{QueryWindow, RemediationRecord};
pub use traits::{CredentialStore, IncidentStore, RemediationStore, ShieldStorage};
