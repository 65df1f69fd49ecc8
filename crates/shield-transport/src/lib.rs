//! # shield-transport
//!
//! How agents find each other and exchange notifications. [`Transport`] is the
//! contract; [`InMemoryBus`] is an explicitly constructed, process-local
//! implementation. There is no global registry: every agent is handed the
//! endpoint it sends and receives through.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod error;
pub mod message;

pub use bus::{BusEndpoint, InMemoryBus, Transport};
pub use error::{TransportError, TransportResult};
pub use message::{
    AgentRef, Message, MessageType, CAP_CI_POLICY, CAP_PATCH_PLANNER, CAP_SECURITY_SCAN,
    CAP_SECURITY_VERIFY,
};
