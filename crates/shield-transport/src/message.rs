use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportResult;

/// Capability advertised by scanner agents.
pub const CAP_SECURITY_SCAN: &str = "security_scan";
/// Capability advertised by verifier agents.
pub const CAP_SECURITY_VERIFY: &str = "security_verify";
/// Capability advertised by CI gate agents.
pub const CAP_CI_POLICY: &str = "ci_policy";
/// Capability advertised by agents that plan patches for verified incidents.
pub const CAP_PATCH_PLANNER: &str = "patch_planner";

/// A registered agent as seen by discovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub agent_id: String,
    pub name: String,
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl AgentRef {
    pub fn new<I, S>(agent_id: impl Into<String>, name: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// True if this agent holds every capability in `required`.
    pub fn has_all(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|cap| self.capabilities.iter().any(|c| c == cap))
    }
}

/// Notification kinds exchanged between agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    PackageRelease,
    VerificationRequest,
    VerificationResult,
    PatchRequest,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::PackageRelease => "package_release",
            MessageType::VerificationRequest => "verification_request",
            MessageType::VerificationResult => "verification_result",
            MessageType::PatchRequest => "patch_request",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivered message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            message_type,
            payload,
            sent_at: Utc::now(),
        }
    }

    /// Decode the payload into a typed body.
    pub fn decode<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
