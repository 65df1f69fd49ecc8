use chrono::Utc;
use shield_incident::{Incident, IncidentLifecycle};
use shield_storage::{
    IncidentStore, RemediationRecord, RemediationStore, ShieldStorage, StorageError,
};
use tracing::info;

use crate::error::{AgentError, AgentResult};

/// Record `action` against a verified incident and mark it `Mitigated`.
///
/// Fails without side effects unless the incident is currently `Verified`.
pub async fn record_remediation(
    storage: &dyn ShieldStorage,
    lifecycle: &IncidentLifecycle,
    incident_id: &str,
    action: &str,
) -> AgentResult<Incident> {
    if action.trim().is_empty() {
        return Err(StorageError::InvalidInput("remediation action is empty".into()).into());
    }
    let incident = storage
        .get_incident(incident_id)
        .await?
        .ok_or_else(|| AgentError::IncidentNotFound(incident_id.to_string()))?;

    let now = Utc::now();
    let update = lifecycle.plan_mitigation(&incident, now)?;
    let mitigated = storage.apply_update(&update).await?;
    storage
        .record_remediation(RemediationRecord {
            incident_id: incident_id.to_string(),
            action: action.to_string(),
            recorded_at: now,
        })
        .await?;

    info!(
        incident_id = %incident_id,
        package = %mitigated.package_name,
        version = %mitigated.version,
        action = %action,
        "Incident mitigated"
    );
    Ok(mitigated)
}
