use serde::{Deserialize, Serialize};
use shield_credential::{CredentialKind, TrustedIssuers};

/// What the gate does for a release with no blocking incident and no valid
/// attestation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Unseen packages are innocent until flagged
    #[default]
    AllowUnknown,
    /// Require an attestation for every release
    DenyUnknown,
}

/// Trust policy for a gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    #[serde(default = "default_trusted_verifiers")]
    pub trusted_verifiers: TrustedIssuers,

    #[serde(default)]
    pub default_policy: DefaultPolicy,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            trusted_verifiers: default_trusted_verifiers(),
            default_policy: DefaultPolicy::default(),
        }
    }
}

fn default_trusted_verifiers() -> TrustedIssuers {
    TrustedIssuers::new(["did:simulator:verifier", "did:zynd:verifier"])
}

/// Published view of a gate's policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub agent_did: String,
    pub trusted_verifiers: Vec<String>,
    pub default_policy: DefaultPolicy,
    pub require_attestation_for_incidents: bool,
    pub attestation_types_accepted: Vec<CredentialKind>,
}

impl GatePolicy {
    pub fn summary(&self, agent_did: impl Into<String>) -> PolicySummary {
        PolicySummary {
            agent_did: agent_did.into(),
            trusted_verifiers: self.trusted_verifiers.iter().map(str::to_string).collect(),
            default_policy: self.default_policy,
            require_attestation_for_incidents: true,
            attestation_types_accepted: vec![CredentialKind::SafeToUse],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_wire_shape() {
        let value = serde_json::to_value(GatePolicy::default().summary("did:simulator:ci")).unwrap();
        assert_eq!(value["default_policy"], "allow_unknown");
        assert_eq!(value["require_attestation_for_incidents"], true);
        assert_eq!(value["attestation_types_accepted"][0], "SafeToUseAttestation");
        assert_eq!(value["trusted_verifiers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: GatePolicy = serde_json::from_str(r#"{"default_policy":"deny_unknown"}"#).unwrap();
        assert_eq!(policy.default_policy, DefaultPolicy::DenyUnknown);
        assert!(policy.trusted_verifiers.contains("did:zynd:verifier"));
    }
}
