//! In-memory reference implementation of the storage traits.
//!
//! Each map sits behind its own lock. Operations touching both incidents and
//! credentials take the incident lock first.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use shield_credential::{Credential, CredentialKind};
use shield_incident::{Incident, IncidentUpdate};
use tracing::debug;

use crate::model::{QueryWindow, RemediationRecord};
use crate::traits::{CredentialStore, IncidentStore, RemediationStore};
use crate::{StorageError, StorageResult};

/// In-memory storage adapter.
#[derive(Default)]
pub struct InMemoryShieldStorage {
    incidents: RwLock<HashMap<String, Incident>>,
    credentials: RwLock<HashMap<String, Credential>>,
    remediations: RwLock<Vec<RemediationRecord>>,
}

impl InMemoryShieldStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(what: &str) -> StorageError {
    StorageError::Backend(format!("{what} lock poisoned"))
}

#[async_trait]
impl IncidentStore for InMemoryShieldStorage {
    async fn put_incident(&self, incident: Incident) -> StorageResult<()> {
        let mut guard = self.incidents.write().map_err(|_| poisoned("incidents"))?;
        guard.insert(incident.id.clone(), incident);
        Ok(())
    }

    async fn get_incident(&self, incident_id: &str) -> StorageResult<Option<Incident>> {
        let guard = self.incidents.read().map_err(|_| poisoned("incidents"))?;
        Ok(guard.get(incident_id).cloned())
    }

    async fn list_incidents(&self, window: QueryWindow) -> StorageResult<Vec<Incident>> {
        let guard = self.incidents.read().map_err(|_| poisoned("incidents"))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_window(values, window))
    }

    async fn list_incidents_for(
        &self,
        package_name: &str,
        version: &str,
    ) -> StorageResult<Vec<Incident>> {
        let guard = self.incidents.read().map_err(|_| poisoned("incidents"))?;
        let mut values = guard
            .values()
            .filter(|incident| incident.concerns(package_name, version))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(values)
    }

    async fn apply_update(&self, update: &IncidentUpdate) -> StorageResult<Incident> {
        let mut guard = self.incidents.write().map_err(|_| poisoned("incidents"))?;
        let record = guard.get_mut(&update.incident_id).ok_or_else(|| {
            StorageError::NotFound(format!("incident {} not found", update.incident_id))
        })?;
        update.apply(record)?;
        debug!(
            incident_id = %record.id,
            status = %record.status,
            credentials = record.credential_ids.len(),
            "Incident updated"
        );
        Ok(record.clone())
    }
}

#[async_trait]
impl CredentialStore for InMemoryShieldStorage {
    async fn put_credential(
        &self,
        credential: Credential,
        incident_id: Option<&str>,
    ) -> StorageResult<()> {
        let mut incidents = self.incidents.write().map_err(|_| poisoned("incidents"))?;
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| poisoned("credentials"))?;

        if credentials.contains_key(&credential.id) {
            return Err(StorageError::Conflict(format!(
                "credential {} already exists",
                credential.id
            )));
        }

        if let Some(incident_id) = incident_id {
            let incident = incidents.get_mut(incident_id).ok_or_else(|| {
                StorageError::NotFound(format!("incident {incident_id} not found"))
            })?;
            if !incident.has_credential(&credential.id) {
                incident.credential_ids.push(credential.id.clone());
                incident.updated_at = Utc::now();
            }
        }

        debug!(
            credential_id = %credential.id,
            kind = %credential.kind(),
            incident_id = ?incident_id,
            "Credential stored"
        );
        credentials.insert(credential.id.clone(), credential);
        Ok(())
    }

    async fn get_credential(&self, credential_id: &str) -> StorageResult<Option<Credential>> {
        let guard = self.credentials.read().map_err(|_| poisoned("credentials"))?;
        Ok(guard.get(credential_id).cloned())
    }

    async fn list_credentials_by_package_version(
        &self,
        kind: CredentialKind,
        package_name: &str,
        version: &str,
    ) -> StorageResult<Vec<Credential>> {
        let guard = self.credentials.read().map_err(|_| poisoned("credentials"))?;
        let mut values = guard
            .values()
            .filter(|c| c.kind() == kind && c.subject.names(package_name, version))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.issuance_time.cmp(&b.issuance_time));
        Ok(values)
    }

    async fn list_credentials(&self, kind: Option<CredentialKind>) -> StorageResult<Vec<Credential>> {
        let guard = self.credentials.read().map_err(|_| poisoned("credentials"))?;
        let mut values = guard
            .values()
            .filter(|c| kind.map_or(true, |k| c.kind() == k))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.issuance_time.cmp(&b.issuance_time));
        Ok(values)
    }
}

#[async_trait]
impl RemediationStore for InMemoryShieldStorage {
    async fn record_remediation(&self, record: RemediationRecord) -> StorageResult<()> {
        if record.action.trim().is_empty() {
            return Err(StorageError::InvalidInput("remediation action is empty".into()));
        }
        let mut guard = self
            .remediations
            .write()
            .map_err(|_| poisoned("remediations"))?;
        guard.push(record);
        Ok(())
    }

    async fn list_remediations(&self, incident_id: &str) -> StorageResult<Vec<RemediationRecord>> {
        let guard = self
            .remediations
            .read()
            .map_err(|_| poisoned("remediations"))?;
        Ok(guard
            .iter()
            .filter(|r| r.incident_id == incident_id)
            .cloned()
            .collect())
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
