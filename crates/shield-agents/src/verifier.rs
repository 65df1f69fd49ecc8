//! Verifier agent: adjudicates findings and drives the incident transition.

use std::sync::Arc;

use chrono::Utc;
use shield_incident::IncidentLifecycle;
use shield_storage::{CredentialStore, IncidentStore, ShieldStorage};
use shield_transport::{
    AgentRef, MessageType, Transport, CAP_CI_POLICY, CAP_PATCH_PLANNER, CAP_SECURITY_VERIFY,
};
use shield_verifier::{VerificationOutcome, Verifier};
use tracing::{info, warn};

use crate::error::{AgentError, AgentResult};
use crate::event::{VerificationRequest, VerificationResult};
use crate::notify::broadcast;

pub const CAP_INCIDENT_RESPONSE: &str = "incident_response";

pub struct VerifierAgent {
    verifier: Verifier,
    lifecycle: IncidentLifecycle,
    storage: Arc<dyn ShieldStorage>,
    transport: Arc<dyn Transport>,
}

impl VerifierAgent {
    pub fn descriptor(agent_id: impl Into<String>) -> AgentRef {
        AgentRef::new(
            agent_id,
            "Verifier Agent",
            [CAP_SECURITY_VERIFY, CAP_INCIDENT_RESPONSE],
        )
    }

    pub fn new(
        verifier: Verifier,
        lifecycle: IncidentLifecycle,
        storage: Arc<dyn ShieldStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            verifier,
            lifecycle,
            storage,
            transport,
        }
    }

    pub fn agent_id(&self) -> &str {
        self.verifier.issuer_id()
    }

    /// Adjudicate one request end to end.
    ///
    /// Each minted credential is attached through a compare-and-set update, so
    /// a concurrent verdict on the same incident makes this call fail instead
    /// of overwriting it. The credential is stored only after its attach
    /// succeeds: a losing verifier leaves no attestation behind for the gate to
    /// find. A storage failure after the attach leaves the id on the trail
    /// without a stored credential, which readers see as a missing credential.
    pub async fn handle_request(
        &self,
        request: &VerificationRequest,
    ) -> AgentResult<VerificationOutcome> {
        let incident = self
            .storage
            .get_incident(&request.incident_id)
            .await?
            .ok_or_else(|| AgentError::IncidentNotFound(request.incident_id.clone()))?;
        let finding = self
            .storage
            .get_credential(&request.credential_id)
            .await?
            .ok_or_else(|| AgentError::CredentialNotFound(request.credential_id.clone()))?;

        let now = Utc::now();
        let outcome =
            self.verifier
                .adjudicate(&finding, &incident, request.prev_version.as_deref(), now)?;

        let mut current = incident;
        for credential in outcome.credentials() {
            let update = self.lifecycle.plan_attach(&current, credential, now)?;
            current = self.storage.apply_update(&update).await?;
            self.storage.put_credential(credential.clone(), None).await?;
        }
        info!(
            incident_id = %current.id,
            status = %current.status,
            credentials = current.credential_ids.len(),
            "Verification recorded"
        );

        let result = VerificationResult {
            incident_id: outcome.incident_id.clone(),
            verified: outcome.verified,
            credential_ids: outcome.credential_ids(),
        };
        broadcast(
            self.transport.as_ref(),
            CAP_CI_POLICY,
            MessageType::VerificationResult,
            &result,
        )
        .await?;
        if outcome.verified {
            broadcast(
                self.transport.as_ref(),
                CAP_PATCH_PLANNER,
                MessageType::PatchRequest,
                &result,
            )
            .await?;
        }

        Ok(outcome)
    }

    /// Handle every `verification_request` waiting in the inbox.
    ///
    /// A request that fails is logged and skipped.
    pub async fn process_inbound(&self) -> AgentResult<Vec<VerificationOutcome>> {
        let mut outcomes = Vec::new();
        for message in self.transport.receive_inbound().await? {
            if message.message_type != MessageType::VerificationRequest {
                continue;
            }
            let request: VerificationRequest = match message.decode() {
                Ok(request) => request,
                Err(err) => {
                    warn!(message_id = %message.id, error = %err, "Malformed verification request");
                    continue;
                }
            };
            match self.handle_request(&request).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(
                    incident_id = %request.incident_id,
                    credential_id = %request.credential_id,
                    error = %err,
                    "Verification request rejected"
                ),
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_credential::{
        CredentialIssuer, CredentialKind, CredentialSubject, CredentialValidator, SharedKeyMac,
        TrustedIssuers,
    };
    use shield_detection::{DetectionConfig, IndicatorKind, RiskIndicator};
    use shield_incident::{Incident, IncidentStatus};
    use shield_storage::{CredentialStore, InMemoryShieldStorage, IncidentStore};
    use shield_transport::InMemoryBus;
    use shield_verifier::RecheckConfig;

    struct Fixture {
        agent: VerifierAgent,
        storage: Arc<InMemoryShieldStorage>,
        scanner: CredentialIssuer,
    }

    async fn fixture(bus: &InMemoryBus) -> Fixture {
        let scheme = Arc::new(SharedKeyMac::new(b"verify-key".to_vec()));
        let storage = Arc::new(InMemoryShieldStorage::new());
        let endpoint = bus
            .connect(VerifierAgent::descriptor("did:simulator:verifier"))
            .await
            .unwrap();
        let verifier = Verifier::new(
            CredentialIssuer::new("did:simulator:verifier", scheme.clone()),
            scheme.clone(),
            TrustedIssuers::new(["did:simulator:scanner"]),
            DetectionConfig::default(),
            RecheckConfig::default(),
        );
        let lifecycle = IncidentLifecycle::new(CredentialValidator::new(
            scheme.clone(),
            TrustedIssuers::new(["did:simulator:verifier"]),
        ));
        Fixture {
            agent: VerifierAgent::new(verifier, lifecycle, storage.clone(), Arc::new(endpoint)),
            storage,
            scanner: CredentialIssuer::new("did:simulator:scanner", scheme),
        }
    }

    async fn seed(f: &Fixture, name: &str) -> VerificationRequest {
        let incident = Incident::open(
            name,
            "1.0.1",
            vec![RiskIndicator::new(IndicatorKind::Typosquat, "x", 0.9, name)],
            Utc::now(),
        )
        .unwrap();
        let finding = f
            .scanner
            .risk_finding(
                CredentialSubject::package(name, "1.0.1").with_incident(&incident.id),
                vec!["x".into()],
                0.9,
                vec![],
                Utc::now(),
            )
            .unwrap();
        let request = VerificationRequest {
            incident_id: incident.id.clone(),
            credential_id: finding.id.clone(),
            package_name: name.into(),
            version: "1.0.1".into(),
            prev_version: Some("1.0.0".into()),
        };
        f.storage.put_incident(incident).await.unwrap();
        f.storage
            .put_credential(finding, Some(&request.incident_id))
            .await
            .unwrap();
        request
    }

    #[tokio::test]
    async fn verified_incident_is_recorded_and_broadcast() {
        let bus = InMemoryBus::new();
        let f = fixture(&bus).await;
        let ci = bus
            .connect(AgentRef::new("did:simulator:ci", "CI", [CAP_CI_POLICY]))
            .await
            .unwrap();
        let patcher = bus
            .connect(AgentRef::new("did:patch", "Patch", [CAP_PATCH_PLANNER]))
            .await
            .unwrap();

        let request = seed(&f, "lodash-utils").await;
        let outcome = f.agent.handle_request(&request).await.unwrap();
        assert!(outcome.verified);

        let incident = f.storage.get_incident(&request.incident_id).await.unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::Verified);
        assert_eq!(incident.credential_ids.len(), 3);
        assert_eq!(incident.credential_ids[1..], outcome.credential_ids()[..]);

        let attestations = f
            .storage
            .list_credentials_by_package_version(CredentialKind::SafeToUse, "lodash-utils", "1.0.0")
            .await
            .unwrap();
        assert_eq!(attestations.len(), 1);

        let ci_inbox = ci.receive_inbound().await.unwrap();
        assert_eq!(ci_inbox.len(), 1);
        assert_eq!(ci_inbox[0].message_type, MessageType::VerificationResult);
        let patch_inbox = patcher.receive_inbound().await.unwrap();
        assert_eq!(patch_inbox[0].message_type, MessageType::PatchRequest);
    }

    #[tokio::test]
    async fn false_positive_skips_patch_planner() {
        let bus = InMemoryBus::new();
        let f = fixture(&bus).await;
        let patcher = bus
            .connect(AgentRef::new("did:patch", "Patch", [CAP_PATCH_PLANNER]))
            .await
            .unwrap();

        let request = seed(&f, "totally-original-name").await;
        let outcome = f.agent.handle_request(&request).await.unwrap();
        assert!(!outcome.verified);
        let incident = f.storage.get_incident(&request.incident_id).await.unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::FalsePositive);
        assert!(patcher.receive_inbound().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_verdict_on_same_incident_is_rejected() {
        let bus = InMemoryBus::new();
        let f = fixture(&bus).await;
        let request = seed(&f, "lodash-utils").await;
        f.agent.handle_request(&request).await.unwrap();
        let again = f.agent.handle_request(&request).await;
        assert!(matches!(again, Err(AgentError::Verifier(_))));
        let stored = f.storage.list_credentials(None).await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn missing_records_are_reported() {
        let bus = InMemoryBus::new();
        let f = fixture(&bus).await;
        let mut request = seed(&f, "lodash-utils").await;
        request.credential_id = "missing".into();
        assert!(matches!(
            f.agent.handle_request(&request).await,
            Err(AgentError::CredentialNotFound(_))
        ));
        request.incident_id = "missing".into();
        assert!(matches!(
            f.agent.handle_request(&request).await,
            Err(AgentError::IncidentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn inbound_requests_are_processed() {
        let bus = InMemoryBus::new();
        let f = fixture(&bus).await;
        let scanner = bus
            .connect(AgentRef::new("did:simulator:scanner", "Scanner", ["security_scan"]))
            .await
            .unwrap();
        let request = seed(&f, "lodash-utils").await;
        let target = f.agent.transport.local_agent().clone();
        scanner
            .send(
                &target,
                MessageType::VerificationRequest,
                serde_json::to_value(&request).unwrap(),
            )
            .await
            .unwrap();

        let outcomes = f.agent.process_inbound().await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].incident_id, request.incident_id);
    }
}
