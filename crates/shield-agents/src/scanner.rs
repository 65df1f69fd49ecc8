//! Scanner agent: release events in, incidents and risk findings out.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shield_credential::{CredentialIssuer, CredentialSubject};
use shield_detection::{DetectionEngine, RiskIndicator};
use shield_incident::{Incident, Severity};
use shield_storage::{CredentialStore, IncidentStore, ShieldStorage};
use shield_transport::{
    AgentRef, MessageType, Transport, CAP_SECURITY_SCAN, CAP_SECURITY_VERIFY,
};
use tracing::{info, warn};

use crate::error::AgentResult;
use crate::event::{ReleaseEvent, VerificationRequest};
use crate::notify::broadcast;

pub const CAP_DEPENDENCY_ANALYSIS: &str = "dependency_analysis";

/// Result of scanning one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub incident_id: Option<String>,
    pub is_suspicious: bool,
    pub severity: Option<Severity>,
    pub indicators: Vec<RiskIndicator>,
    pub credential_id: Option<String>,
}

impl ScanReport {
    fn clean() -> Self {
        Self {
            incident_id: None,
            is_suspicious: false,
            severity: None,
            indicators: Vec::new(),
            credential_id: None,
        }
    }
}

pub struct ScannerAgent {
    issuer: CredentialIssuer,
    engine: DetectionEngine,
    storage: Arc<dyn ShieldStorage>,
    transport: Arc<dyn Transport>,
}

impl ScannerAgent {
    /// Registry entry a scanner connects to the bus with.
    pub fn descriptor(agent_id: impl Into<String>) -> AgentRef {
        AgentRef::new(
            agent_id,
            "Scanner Agent",
            [CAP_SECURITY_SCAN, CAP_DEPENDENCY_ANALYSIS],
        )
    }

    pub fn new(
        issuer: CredentialIssuer,
        engine: DetectionEngine,
        storage: Arc<dyn ShieldStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            issuer,
            engine,
            storage,
            transport,
        }
    }

    pub fn agent_id(&self) -> &str {
        self.issuer.issuer_id()
    }

    /// Scan `event`; when suspicious, persist an incident with its finding
    /// and ask every verifier to adjudicate it.
    pub async fn handle_release(&self, event: &ReleaseEvent) -> AgentResult<ScanReport> {
        let analysis = self.engine.analyze(
            &event.package_name,
            &event.new_version,
            &event.manifest,
            event.content_sample.as_deref(),
        );
        let now = Utc::now();
        let Some(incident) = Incident::open(
            &event.package_name,
            &event.new_version,
            analysis.indicators,
            now,
        ) else {
            return Ok(ScanReport::clean());
        };

        let finding = self.issuer.risk_finding(
            CredentialSubject::package(&incident.package_name, &incident.version)
                .with_incident(&incident.id),
            incident
                .indicators
                .iter()
                .map(|i| i.description.clone())
                .collect(),
            incident.confidence(),
            incident
                .indicators
                .iter()
                .filter(|i| !i.evidence_digest.is_empty())
                .map(|i| i.evidence_digest.clone())
                .collect(),
            now,
        )?;

        let report = ScanReport {
            incident_id: Some(incident.id.clone()),
            is_suspicious: true,
            severity: Some(incident.severity),
            indicators: incident.indicators.clone(),
            credential_id: Some(finding.id.clone()),
        };
        let request = VerificationRequest {
            incident_id: incident.id.clone(),
            credential_id: finding.id.clone(),
            package_name: incident.package_name.clone(),
            version: incident.version.clone(),
            prev_version: event.prev_version.clone(),
        };

        info!(
            incident_id = %incident.id,
            package = %incident.package_name,
            version = %incident.version,
            severity = ?incident.severity,
            credential_id = %finding.id,
            "Incident opened"
        );
        self.storage.put_incident(incident).await?;
        self.storage
            .put_credential(finding, Some(&request.incident_id))
            .await?;

        let notified = broadcast(
            self.transport.as_ref(),
            CAP_SECURITY_VERIFY,
            MessageType::VerificationRequest,
            &request,
        )
        .await?;
        if notified == 0 {
            warn!(incident_id = %request.incident_id, "No verifier reachable");
        }

        Ok(report)
    }

    /// Scan every `package_release` message waiting in the inbox.
    ///
    /// A release that fails to scan is logged and skipped.
    pub async fn process_inbound(&self) -> AgentResult<Vec<ScanReport>> {
        let mut reports = Vec::new();
        for message in self.transport.receive_inbound().await? {
            if message.message_type != MessageType::PackageRelease {
                continue;
            }
            let event: ReleaseEvent = match message.decode() {
                Ok(event) => event,
                Err(err) => {
                    warn!(message_id = %message.id, error = %err, "Malformed release event");
                    continue;
                }
            };
            match self.handle_release(&event).await {
                Ok(report) => reports.push(report),
                Err(err) => warn!(
                    package = %event.package_name,
                    version = %event.new_version,
                    error = %err,
                    "Release scan failed"
                ),
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_credential::{CredentialError, CredentialKind, ProofSigner, SharedKeyMac};
    use shield_incident::IncidentStatus;
    use shield_storage::{CredentialStore, InMemoryShieldStorage, IncidentStore};
    use shield_transport::InMemoryBus;

    async fn scanner(bus: &InMemoryBus) -> (ScannerAgent, Arc<InMemoryShieldStorage>) {
        let storage = Arc::new(InMemoryShieldStorage::new());
        let endpoint = bus
            .connect(ScannerAgent::descriptor("did:simulator:scanner"))
            .await
            .unwrap();
        let issuer = CredentialIssuer::new(
            "did:simulator:scanner",
            Arc::new(SharedKeyMac::new(b"scan-key".to_vec())),
        );
        (
            ScannerAgent::new(
                issuer,
                DetectionEngine::default(),
                storage.clone(),
                Arc::new(endpoint),
            ),
            storage,
        )
    }

    #[tokio::test]
    async fn clean_release_opens_nothing() {
        let bus = InMemoryBus::new();
        let (agent, storage) = scanner(&bus).await;
        let report = agent
            .handle_release(&ReleaseEvent::new("express", "4.18.3"))
            .await
            .unwrap();
        assert_eq!(report, ScanReport::clean());
        assert!(storage.list_credentials(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suspicious_release_is_persisted_and_announced() {
        let bus = InMemoryBus::new();
        let (agent, storage) = scanner(&bus).await;
        let verifier = bus
            .connect(AgentRef::new("did:v", "V", [CAP_SECURITY_VERIFY]))
            .await
            .unwrap();

        let event = ReleaseEvent::new("lodash-utils", "1.0.1").with_prev_version("1.0.0");
        let report = agent.handle_release(&event).await.unwrap();
        assert!(report.is_suspicious);
        assert_eq!(report.severity, Some(Severity::Critical));

        let incident_id = report.incident_id.clone().unwrap();
        let incident = storage.get_incident(&incident_id).await.unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::Detected);
        assert_eq!(incident.title, "Suspicious package: lodash-utils@1.0.1");
        assert_eq!(incident.credential_ids, vec![report.credential_id.clone().unwrap()]);

        let finding = storage
            .get_credential(report.credential_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(finding.kind(), CredentialKind::RiskFinding);
        let claims = finding.risk_finding().unwrap();
        assert_eq!(claims.reasons, vec!["Pattern match with 'lodash' variant"]);
        assert_eq!(claims.evidence_hashes.len(), 1);

        let inbound = verifier.receive_inbound().await.unwrap();
        assert_eq!(inbound.len(), 1);
        let request: VerificationRequest = inbound[0].decode().unwrap();
        assert_eq!(request.incident_id, incident_id);
        assert_eq!(request.prev_version.as_deref(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn inbound_release_messages_are_scanned() {
        let bus = InMemoryBus::new();
        let (agent, _storage) = scanner(&bus).await;
        let registry = bus
            .connect(AgentRef::new("did:registry", "Registry", ["release_feed"]))
            .await
            .unwrap();
        let target = agent.transport.local_agent().clone();
        registry
            .send(
                &target,
                MessageType::PackageRelease,
                serde_json::to_value(ReleaseEvent::new("expresss", "1.0.0")).unwrap(),
            )
            .await
            .unwrap();
        registry
            .send(&target, MessageType::PackageRelease, serde_json::json!({"bogus": 1}))
            .await
            .unwrap();

        let reports = agent.process_inbound().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_suspicious);
    }

    /// Signs like the shared key, except for credentials naming `refused`.
    struct RefusingSigner {
        inner: SharedKeyMac,
        refused: &'static str,
    }

    impl ProofSigner for RefusingSigner {
        fn proof_type(&self) -> &str {
            self.inner.proof_type()
        }

        fn sign(&self, canonical: &[u8]) -> Result<String, CredentialError> {
            if String::from_utf8_lossy(canonical).contains(self.refused) {
                return Err(CredentialError::Signing("signer unavailable".into()));
            }
            self.inner.sign(canonical)
        }
    }

    #[tokio::test]
    async fn failed_release_does_not_drop_the_rest_of_the_batch() {
        let bus = InMemoryBus::new();
        let storage = Arc::new(InMemoryShieldStorage::new());
        let endpoint = bus
            .connect(ScannerAgent::descriptor("did:simulator:scanner"))
            .await
            .unwrap();
        let signer = RefusingSigner {
            inner: SharedKeyMac::new(b"scan-key".to_vec()),
            refused: "expresss",
        };
        let agent = ScannerAgent::new(
            CredentialIssuer::new("did:simulator:scanner", Arc::new(signer)),
            DetectionEngine::default(),
            storage.clone(),
            Arc::new(endpoint),
        );

        let registry = bus
            .connect(AgentRef::new("did:registry", "Registry", ["release_feed"]))
            .await
            .unwrap();
        let target = agent.transport.local_agent().clone();
        for event in [
            ReleaseEvent::new("expresss", "1.0.0"),
            ReleaseEvent::new("lodash-utils", "1.0.1"),
        ] {
            registry
                .send(
                    &target,
                    MessageType::PackageRelease,
                    serde_json::to_value(event).unwrap(),
                )
                .await
                .unwrap();
        }

        let reports = agent.process_inbound().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_suspicious);
        let incident = storage
            .get_incident(reports[0].incident_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(incident.package_name, "lodash-utils");
    }
}
