use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::Serialize;
use shield_agents::{IssuerKeyConfig, ReleaseEvent, ShieldConfig, Swarm};
use shield_credential::{Credential, CredentialValidator, TrustedIssuers};
use shield_detection::DetectionEngine;
use shield_storage::InMemoryShieldStorage;
use shield_transport::InMemoryBus;
use tracing::info;

/// Where a release comes from: an event file, or flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ReleaseArgs {
    /// Release event JSON file
    #[arg(long, conflicts_with_all = ["name", "new_version"])]
    pub event: Option<String>,

    /// Package name
    #[arg(long)]
    pub name: Option<String>,

    /// Version being released
    #[arg(long = "new-version")]
    pub new_version: Option<String>,

    /// Version it replaces
    #[arg(long = "prev-version")]
    pub prev_version: Option<String>,

    /// Manifest JSON file (package.json)
    #[arg(long)]
    pub manifest: Option<String>,

    /// Source sample to scan for obfuscation
    #[arg(long)]
    pub sample: Option<String>,
}

impl ReleaseArgs {
    pub fn to_event(&self) -> anyhow::Result<ReleaseEvent> {
        let mut event = match &self.event {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading release event {path}"))?;
                serde_json::from_str::<ReleaseEvent>(&raw)
                    .with_context(|| format!("parsing release event {path}"))?
            }
            None => {
                let (Some(name), Some(version)) = (&self.name, &self.new_version) else {
                    bail!("either --event or both --name and --new-version are required");
                };
                ReleaseEvent::new(name, version)
            }
        };

        if let Some(prev) = &self.prev_version {
            event.prev_version = Some(prev.clone());
        }
        if let Some(path) = &self.manifest {
            let raw =
                fs::read_to_string(path).with_context(|| format!("reading manifest {path}"))?;
            event.manifest =
                serde_json::from_str(&raw).with_context(|| format!("parsing manifest {path}"))?;
        }
        if let Some(path) = &self.sample {
            event.content_sample = Some(
                fs::read_to_string(path).with_context(|| format!("reading sample {path}"))?,
            );
        }
        Ok(event)
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn analyze(config: &ShieldConfig, release: &ReleaseArgs) -> anyhow::Result<()> {
    let event = release.to_event()?;
    let engine = DetectionEngine::new(config.detection.clone());
    let analysis = engine.analyze(
        &event.package_name,
        &event.new_version,
        &event.manifest,
        event.content_sample.as_deref(),
    );
    print_json(&serde_json::json!({
        "package_name": event.package_name,
        "version": event.new_version,
        "suspicious": !analysis.is_clean(),
        "analysis": analysis,
    }))
}

pub async fn run(
    config: &ShieldConfig,
    release: &ReleaseArgs,
    project: &str,
    remediate: Option<&str>,
) -> anyhow::Result<()> {
    let event = release.to_event()?;
    let swarm = Swarm::assemble(
        config,
        Arc::new(InMemoryShieldStorage::new()),
        InMemoryBus::new(),
    )
    .await?;

    let report = swarm.run_release(&event, project).await?;

    let mut mitigated = None;
    if let (Some(action), Some(outcome)) = (remediate, &report.verification) {
        if outcome.verified {
            let incident = swarm.record_remediation(&outcome.incident_id, action).await?;
            info!(incident_id = %incident.id, "Remediation recorded");
            mitigated = Some(incident);
        }
    }

    print_json(&serde_json::json!({
        "report": report,
        "mitigated_incident": mitigated,
    }))
}

/// Outcome of checking one credential file.
#[derive(Debug, Serialize)]
struct CredentialCheck {
    id: String,
    kind: String,
    issuer: String,
    proof_valid: bool,
    valid: bool,
    reason: String,
}

pub fn verify_credential(
    config: &ShieldConfig,
    path: &str,
    trusted: &[String],
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading credential {path}"))?;
    let credential: Credential =
        serde_json::from_str(&raw).with_context(|| format!("parsing credential {path}"))?;

    let keys = config.proof_keys()?;
    let validator = CredentialValidator::new(keys.verifier(), trust_set(config, trusted));
    let validity = validator.validate(&credential);

    let check = CredentialCheck {
        id: credential.id.clone(),
        kind: credential.kind().to_string(),
        issuer: credential.issuer_id.clone(),
        proof_valid: credential.verify(validator.verifier()),
        valid: validity.is_valid(),
        reason: validity.to_string(),
    };
    print_json(&check)?;
    if !check.valid {
        bail!("credential {} rejected: {}", check.id, check.reason);
    }
    Ok(())
}

/// Explicit `--trust` ids, or the configured verifiers and scanners.
fn trust_set(config: &ShieldConfig, explicit: &[String]) -> TrustedIssuers {
    if !explicit.is_empty() {
        return TrustedIssuers::new(explicit.iter().cloned());
    }
    TrustedIssuers::new(
        config
            .gate
            .trusted_verifiers
            .iter()
            .chain(config.trusted_scanners.iter())
            .map(str::to_string),
    )
}

pub fn keygen(issuer: &str) -> anyhow::Result<()> {
    let signing_key = SigningKey::generate(&mut OsRng);
    print_json(&IssuerKeyConfig {
        issuer_id: issuer.to_string(),
        signing_key: Some(hex::encode(signing_key.to_bytes())),
        verifying_key: Some(hex::encode(signing_key.verifying_key().to_bytes())),
    })
}

pub fn show_config(config: &ShieldConfig) -> anyhow::Result<()> {
    println!("{config:#?}");
    print_json(&config.gate.summary(&config.agents.ci))
}
