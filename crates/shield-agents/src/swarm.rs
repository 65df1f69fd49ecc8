//! In-process assembly of the three agents on one bus.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shield_credential::CredentialValidator;
use shield_detection::DetectionEngine;
use shield_incident::{Incident, IncidentLifecycle};
use shield_storage::ShieldStorage;
use shield_transport::InMemoryBus;
use shield_verifier::{VerificationOutcome, Verifier};
use tracing::info;

use crate::ci::{CheckResponse, CiAgent};
use crate::config::ShieldConfig;
use crate::error::AgentResult;
use crate::event::ReleaseEvent;
use crate::remediation::record_remediation;
use crate::scanner::{ScanReport, ScannerAgent};
use crate::verifier::VerifierAgent;

/// Everything that happened to one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub scan: ScanReport,
    pub verification: Option<VerificationOutcome>,
    /// Gate answer for the new version
    pub gate: CheckResponse,
    /// Gate answer for the previous version, when the event names one
    pub previous_gate: Option<CheckResponse>,
}

pub struct Swarm {
    pub scanner: ScannerAgent,
    pub verifier: VerifierAgent,
    pub ci: CiAgent,
    storage: Arc<dyn ShieldStorage>,
    lifecycle: IncidentLifecycle,
    bus: InMemoryBus,
}

impl Swarm {
    /// Build and register the scanner, verifier and CI agents.
    pub async fn assemble(
        config: &ShieldConfig,
        storage: Arc<dyn ShieldStorage>,
        bus: InMemoryBus,
    ) -> AgentResult<Self> {
        let keys = config.proof_keys()?;
        let ids = &config.agents;
        let lifecycle = IncidentLifecycle::new(CredentialValidator::new(
            keys.verifier(),
            config.gate.trusted_verifiers.clone(),
        ));

        let scanner = ScannerAgent::new(
            keys.issuer(&ids.scanner)?,
            DetectionEngine::new(config.detection.clone()),
            storage.clone(),
            Arc::new(bus.connect(ScannerAgent::descriptor(&ids.scanner)).await?),
        );
        let verifier = VerifierAgent::new(
            Verifier::new(
                keys.issuer(&ids.verifier)?,
                keys.verifier(),
                config.trusted_scanners.clone(),
                config.detection.clone(),
                config.recheck.clone(),
            ),
            lifecycle.clone(),
            storage.clone(),
            Arc::new(bus.connect(VerifierAgent::descriptor(&ids.verifier)).await?),
        );
        let ci = CiAgent::new(
            &ids.ci,
            keys.verifier(),
            config.gate.clone(),
            storage.clone(),
            Arc::new(bus.connect(CiAgent::descriptor(&ids.ci)).await?),
        );

        info!(
            scanner = %ids.scanner,
            verifier = %ids.verifier,
            ci = %ids.ci,
            scheme = ?config.signing.scheme,
            "Swarm assembled"
        );
        Ok(Self {
            scanner,
            verifier,
            ci,
            storage,
            lifecycle,
            bus,
        })
    }

    pub fn storage(&self) -> &Arc<dyn ShieldStorage> {
        &self.storage
    }

    pub fn bus(&self) -> &InMemoryBus {
        &self.bus
    }

    /// Scan, verify and gate one release, draining each inbox in turn.
    pub async fn run_release(&self, event: &ReleaseEvent, project_id: &str) -> AgentResult<FlowReport> {
        let scan = self.scanner.handle_release(event).await?;
        let verification = self.verifier.process_inbound().await?.into_iter().next();
        self.ci.process_inbound().await?;

        let gate = self
            .ci
            .check_update(project_id, &event.package_name, &event.new_version)
            .await?;
        let previous_gate = match &event.prev_version {
            Some(prev) => Some(
                self.ci
                    .check_update(project_id, &event.package_name, prev)
                    .await?,
            ),
            None => None,
        };

        Ok(FlowReport {
            scan,
            verification,
            gate,
            previous_gate,
        })
    }

    pub async fn record_remediation(&self, incident_id: &str, action: &str) -> AgentResult<Incident> {
        record_remediation(self.storage.as_ref(), &self.lifecycle, incident_id, action).await
    }
}
