//! CI gate agent: answers whether a dependency update may be deployed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shield_credential::{CredentialKind, ProofVerifier};
use shield_gate::{
    blocking_incidents, AttestationAssessment, GateOutcome, GatePolicy, PolicySummary,
    TrustEvaluator,
};
use shield_storage::{CredentialStore, IncidentStore, ShieldStorage};
use shield_transport::{AgentRef, MessageType, Transport, CAP_CI_POLICY};
use tracing::{info, warn};

use crate::error::AgentResult;
use crate::event::VerificationResult;

pub const CAP_RELEASE_GATEKEEPING: &str = "release_gatekeeping";

/// Answer to a `check_update` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub reason: String,
    pub outcome: GateOutcome,
    /// Credential kinds that would unblock the release
    pub required_credentials: Vec<CredentialKind>,
    pub blocking_incidents: Vec<String>,
    pub attestations: Vec<AttestationAssessment>,
}

pub struct CiAgent {
    agent_id: String,
    policy: GatePolicy,
    evaluator: TrustEvaluator,
    storage: Arc<dyn ShieldStorage>,
    transport: Arc<dyn Transport>,
}

impl CiAgent {
    pub fn descriptor(agent_id: impl Into<String>) -> AgentRef {
        AgentRef::new(agent_id, "CI Agent", [CAP_CI_POLICY, CAP_RELEASE_GATEKEEPING])
    }

    pub fn new(
        agent_id: impl Into<String>,
        verifier: Arc<dyn ProofVerifier>,
        policy: GatePolicy,
        storage: Arc<dyn ShieldStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            evaluator: TrustEvaluator::new(verifier, policy.clone()),
            policy,
            storage,
            transport,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Published gate policy.
    pub fn policy(&self) -> PolicySummary {
        self.policy.summary(&self.agent_id)
    }

    /// Decide whether `project_id` may take `package_name@version`.
    pub async fn check_update(
        &self,
        project_id: &str,
        package_name: &str,
        version: &str,
    ) -> AgentResult<CheckResponse> {
        let incidents = self.storage.list_incidents_for(package_name, version).await?;
        let blocking = blocking_incidents(&incidents, package_name, version);
        let candidates = self
            .storage
            .list_credentials_by_package_version(CredentialKind::SafeToUse, package_name, version)
            .await?;

        let decision =
            self.evaluator
                .decide_for(package_name, version, !blocking.is_empty(), &candidates);
        info!(
            project_id = %project_id,
            package = %package_name,
            version = %version,
            allowed = decision.allowed,
            blocking = blocking.len(),
            "Update checked"
        );

        let required_credentials = if decision.allowed {
            Vec::new()
        } else {
            vec![CredentialKind::SafeToUse]
        };
        Ok(CheckResponse {
            allowed: decision.allowed,
            reason: decision.reason,
            outcome: decision.outcome,
            required_credentials,
            blocking_incidents: blocking,
            attestations: decision.assessments,
        })
    }

    /// Drain `verification_result` notifications, logging each one.
    pub async fn process_inbound(&self) -> AgentResult<Vec<VerificationResult>> {
        let mut results = Vec::new();
        for message in self.transport.receive_inbound().await? {
            if message.message_type != MessageType::VerificationResult {
                continue;
            }
            match message.decode::<VerificationResult>() {
                Ok(result) => {
                    info!(
                        from = %message.from,
                        incident_id = %result.incident_id,
                        verified = result.verified,
                        "Verification result received"
                    );
                    results.push(result);
                }
                Err(err) => {
                    warn!(message_id = %message.id, error = %err, "Malformed verification result")
                }
            }
        }
        Ok(results)
    }
}
